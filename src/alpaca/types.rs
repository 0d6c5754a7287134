use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Deserialize Alpaca string-encoded numbers (`"0.2500"`) to `Option<f64>`.
pub fn opt_string_or_number_to_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        _ => Err(serde::de::Error::custom("invalid numeric value")),
    }
}

/// One record of `GET /v2/calendar`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub open: Option<String>,
    #[serde(default)]
    pub close: Option<String>,
}

/// One bar of `GET /v2/stocks/bars`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
}

/// Multi-symbol bars payload; `bars` is keyed by symbol.
#[derive(Debug, Deserialize)]
pub struct BarsResponse {
    #[serde(default)]
    pub bars: Option<HashMap<String, Vec<AlpacaBar>>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Echo of a created order from `POST /v2/orders`.
#[derive(Debug, Deserialize)]
pub struct AlpacaOrderResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "opt_string_or_number_to_f64")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number_to_f64")]
    pub filled_avg_price: Option<f64>,
}
