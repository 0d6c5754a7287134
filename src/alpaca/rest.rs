use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::config::AlpacaConfig;
use crate::error::SourceError;
use crate::model::bar::{sort_ascending, Bar};
use crate::model::order::{OrderAck, OrderRequest};

use super::types::{AlpacaOrderResponse, BarsResponse, CalendarDay};

/// Bar granularity accepted by the Alpaca data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    OneMinute,
    OneDay,
}

impl Timeframe {
    pub fn as_alpaca_str(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1Min",
            Timeframe::OneDay => "1Day",
        }
    }
}

pub struct AlpacaRestClient {
    http: reqwest::Client,
    trading_base_url: String,
    data_base_url: String,
    feed: String,
}

impl AlpacaRestClient {
    pub fn new(config: &AlpacaConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if config.has_credentials() {
            headers.insert("APCA-API-KEY-ID", HeaderValue::from_str(&config.api_key)?);
            headers.insert(
                "APCA-API-SECRET-KEY",
                HeaderValue::from_str(&config.api_secret)?,
            );
        } else {
            tracing::warn!(
                "ALPACA_API_KEY / ALPACA_SECRET_KEY not set; requests will be unauthenticated"
            );
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to build Alpaca HTTP client")?;
        Ok(Self {
            http,
            trading_base_url: config.trading_base_url.trim_end_matches('/').to_string(),
            data_base_url: config.data_base_url.trim_end_matches('/').to_string(),
            feed: config.feed.clone(),
        })
    }

    async fn get_text(&self, request: reqwest::RequestBuilder) -> Result<String, SourceError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }

    /// Trading-day records for `[date, date]`.
    pub async fn get_calendar(&self, date: NaiveDate) -> Result<Vec<CalendarDay>, SourceError> {
        let url = format!("{}/v2/calendar", self.trading_base_url);
        let day = date.format("%Y-%m-%d").to_string();
        let body = self
            .get_text(
                self.http
                    .get(&url)
                    .query(&[("start", day.as_str()), ("end", day.as_str())]),
            )
            .await?;
        parse_calendar(&body)
    }

    /// Latest `limit` bars for `symbol` at or after `start`, returned oldest first.
    ///
    /// Without `start` the data API only looks at the current day, which never
    /// holds more than one daily bar.
    pub async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        start: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, SourceError> {
        let url = format!("{}/v2/stocks/bars", self.data_base_url);
        let query = bars_query(symbol, timeframe, limit, start, &self.feed);
        let body = self.get_text(self.http.get(&url).query(&query)).await?;
        parse_bars(&body, symbol)
    }

    /// Exactly one order-creation call; never retried.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, SourceError> {
        let url = format!("{}/v2/orders", self.trading_base_url);
        tracing::info!(
            symbol = %order.symbol,
            side = %order.side,
            qty = order.quantity,
            order_type = %order.order_type,
            time_in_force = %order.time_in_force,
            "Placing order"
        );
        let body = self.get_text(self.http.post(&url).json(order)).await?;
        parse_order_ack(&body)
    }
}

/// Query string for `/v2/stocks/bars`.
pub fn bars_query(
    symbol: &str,
    timeframe: Timeframe,
    limit: usize,
    start: Option<NaiveDate>,
    feed: &str,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("symbols", symbol.to_string()),
        ("timeframe", timeframe.as_alpaca_str().to_string()),
        ("limit", limit.clamp(1, 10_000).to_string()),
        // Newest first so `limit` keeps the latest bars; re-sorted ascending in `parse_bars`.
        ("sort", "desc".to_string()),
        ("feed", feed.to_string()),
    ];
    if let Some(start) = start {
        query.push(("start", start.format("%Y-%m-%d").to_string()));
    }
    query
}

pub fn parse_calendar(body: &str) -> Result<Vec<CalendarDay>, SourceError> {
    Ok(serde_json::from_str(body)?)
}

/// Open iff the calendar has a trading-day record for `date` itself.
pub fn calendar_has_session(days: &[CalendarDay], date: NaiveDate) -> bool {
    days.iter().any(|d| d.date == date)
}

pub fn parse_bars(body: &str, symbol: &str) -> Result<Vec<Bar>, SourceError> {
    let root: BarsResponse = serde_json::from_str(body)?;
    let mut bars: Vec<Bar> = root
        .bars
        .and_then(|mut by_symbol| by_symbol.remove(symbol))
        .unwrap_or_default()
        .into_iter()
        .map(|b| Bar {
            timestamp: b.timestamp,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
        })
        .collect();
    sort_ascending(&mut bars);
    Ok(bars)
}

pub fn parse_order_ack(body: &str) -> Result<OrderAck, SourceError> {
    let order: AlpacaOrderResponse = serde_json::from_str(body)?;
    Ok(OrderAck {
        id: order.id,
        status: order.status,
        symbol: order.symbol,
        qty: order.qty,
        filled_avg_price: order.filled_avg_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_strings() {
        assert_eq!(Timeframe::OneMinute.as_alpaca_str(), "1Min");
        assert_eq!(Timeframe::OneDay.as_alpaca_str(), "1Day");
    }

    #[test]
    fn empty_bars_payload_is_empty_vec() {
        let bars = parse_bars(r#"{"bars": {}, "next_page_token": null}"#, "VOO").unwrap();
        assert!(bars.is_empty());
        let bars = parse_bars(r#"{"bars": null}"#, "VOO").unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn bars_query_without_start_has_no_start_param() {
        let query = bars_query("VOO", Timeframe::OneMinute, 0, None, "iex");
        assert!(query.iter().all(|(k, _)| *k != "start"));
        assert!(query.contains(&("limit", "1".to_string())));
    }
}
