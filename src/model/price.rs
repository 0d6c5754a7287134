use crate::error::SourceError;

/// Yesterday's close and the current price for one symbol, fetched once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub symbol: String,
    pub previous_close: f64,
    pub current_price: f64,
}

impl PriceSample {
    pub fn new(symbol: &str, previous_close: f64, current_price: f64) -> Result<Self, SourceError> {
        if !previous_close.is_finite() || previous_close <= 0.0 {
            return Err(SourceError::DataUnavailable(format!(
                "{}: previous close {} is not a usable reference price",
                symbol, previous_close
            )));
        }
        if !current_price.is_finite() {
            return Err(SourceError::DataUnavailable(format!(
                "{}: current price {} is not finite",
                symbol, current_price
            )));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            previous_close,
            current_price,
        })
    }

    /// (current - previous) / previous * 100
    pub fn percent_change(&self) -> f64 {
        (self.current_price - self.previous_close) / self.previous_close * 100.0
    }
}
