//! Contrarian dollar-cost-averaging order sizing.
//!
//! Buys only dips: the quantity grows with the drop below yesterday's close,
//! and grows further when market sentiment is fearful (low score). Pure and
//! deterministic; no I/O.

/// Shares bought per 1% drop when no sentiment is available.
pub const DEFAULT_BASE_RATE: f64 = 0.10;

/// Round half away from zero to 4 decimal places.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// `100 / sentiment` for a score in (0, 100]; `None` otherwise.
pub fn sentiment_multiplier(sentiment: f64) -> Option<f64> {
    if sentiment.is_finite() && sentiment > 0.0 && sentiment <= 100.0 {
        Some(100.0 / sentiment)
    } else {
        None
    }
}

/// Quantity to buy for a given percent change since the previous close.
///
/// - `percent_change >= 0` buys nothing.
/// - Without sentiment: `|percent_change| * base_rate`.
/// - With sentiment: `|percent_change| * (100 / sentiment) * base_rate`.
///
/// The result is rounded to 4 decimals and never negative or non-finite. A
/// sentiment outside (0, 100] is ignored rather than divided by.
pub fn size_order(percent_change: f64, sentiment: Option<f64>, base_rate: f64) -> f64 {
    if !percent_change.is_finite() || percent_change >= 0.0 {
        return 0.0;
    }
    if !base_rate.is_finite() || base_rate <= 0.0 {
        return 0.0;
    }
    let multiplier = sentiment.and_then(sentiment_multiplier).unwrap_or(1.0);
    let qty = round4(percent_change.abs() * multiplier * base_rate);
    if qty.is_finite() && qty > 0.0 {
        qty
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round4_to_four_places() {
        assert_eq!(round4(0.12346), 0.1235);
        assert_eq!(round4(0.25), 0.25);
        assert_eq!(round4(1.00004), 1.0);
    }

    #[test]
    fn multiplier_bounds() {
        assert_eq!(sentiment_multiplier(50.0), Some(2.0));
        assert_eq!(sentiment_multiplier(100.0), Some(1.0));
        assert_eq!(sentiment_multiplier(0.0), None);
        assert_eq!(sentiment_multiplier(101.0), None);
    }

    #[test]
    fn zero_sentiment_falls_back_to_base_rule() {
        assert_eq!(size_order(-2.5, Some(0.0), DEFAULT_BASE_RATE), 0.25);
    }

    #[test]
    fn bad_base_rate_buys_nothing() {
        assert_eq!(size_order(-2.5, None, 0.0), 0.0);
        assert_eq!(size_order(-2.5, None, f64::NAN), 0.0);
    }
}
