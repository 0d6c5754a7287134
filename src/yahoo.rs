//! Yahoo Finance v8 chart client for short daily-close windows.
//!
//! Yahoo has no official API and changes its payload without notice; any
//! shape mismatch surfaces as a parse error rather than a panic.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;

use crate::error::SourceError;
use crate::model::bar::Bar;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("failed to build Yahoo HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Daily bars for `range` (e.g. `2d`), oldest first.
    pub async fn daily_history(&self, symbol: &str, range: &str) -> Result<Vec<Bar>, SourceError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response = self
            .http
            .get(&url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::from_status(status.as_u16(), &body));
        }
        parse_chart(symbol, &body)
    }
}

/// Parse a chart payload, skipping rows without a close (holidays, partial data).
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Bar>, SourceError> {
    let resp: ChartResponse = serde_json::from_str(body)?;
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(SourceError::DataUnavailable(format!(
                "{}: symbol not found",
                symbol
            )))
        }
        (None, Some(err)) => {
            return Err(SourceError::Parse(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(SourceError::Parse("empty result with no error".into()));
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Err(SourceError::DataUnavailable(format!(
            "{}: result array is empty",
            symbol
        )));
    };
    let timestamps = data.timestamp.unwrap_or_default();
    let Some(quote) = data.indicators.quote.into_iter().next() else {
        return Err(SourceError::Parse("no quote data".into()));
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let timestamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| SourceError::Parse(format!("invalid timestamp: {ts}")))?;
        bars.push(Bar {
            timestamp,
            open: quote.open.get(i).copied().flatten().unwrap_or(close),
            high: quote.high.get(i).copied().flatten().unwrap_or(close),
            low: quote.low.get(i).copied().flatten().unwrap_or(close),
            close,
        });
    }
    crate::model::bar::sort_ascending(&mut bars);
    Ok(bars)
}
