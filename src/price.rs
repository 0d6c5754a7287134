use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::alpaca::{AlpacaRestClient, Timeframe};
use crate::error::SourceError;
use crate::model::bar::Bar;
use crate::model::price::PriceSample;
use crate::yahoo::YahooChartClient;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Sample for the run on exchange-local `date`. `DataUnavailable` means
    /// "skip this run", not a fatal error.
    async fn get_price_sample(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<PriceSample, SourceError>;

    fn name(&self) -> &'static str;
}

/// Calendar days searched back for daily bars; covers weekends and holiday runs.
pub const DAILY_LOOKBACK_DAYS: i64 = 10;

/// First day of the daily-bar window for a run on `date`.
pub fn daily_bars_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(DAILY_LOOKBACK_DAYS)
}

/// previous_close = second-to-last daily close, current_price = latest 1-minute close.
pub fn sample_from_daily_and_minute(
    symbol: &str,
    daily: &[Bar],
    minute: &[Bar],
) -> Result<PriceSample, SourceError> {
    if daily.len() < 2 {
        return Err(SourceError::DataUnavailable(format!(
            "{}: need 2 daily bars, got {}",
            symbol,
            daily.len()
        )));
    }
    let previous_close = daily[daily.len() - 2].close;
    let Some(latest) = minute.last() else {
        return Err(SourceError::DataUnavailable(format!(
            "{}: no 1-minute bar available",
            symbol
        )));
    };
    PriceSample::new(symbol, previous_close, latest.close)
}

/// previous_close = close of day -2, current_price = close of day -1.
pub fn sample_from_window(symbol: &str, bars: &[Bar]) -> Result<PriceSample, SourceError> {
    match bars {
        [.., prev, last] => PriceSample::new(symbol, prev.close, last.close),
        _ => Err(SourceError::DataUnavailable(format!(
            "{}: need 2 daily closes, got {}",
            symbol,
            bars.len()
        ))),
    }
}

pub struct DailyBarSource {
    client: Arc<AlpacaRestClient>,
}

impl DailyBarSource {
    pub fn new(client: Arc<AlpacaRestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for DailyBarSource {
    async fn get_price_sample(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<PriceSample, SourceError> {
        let daily = self
            .client
            .get_bars(symbol, Timeframe::OneDay, 2, Some(daily_bars_start(date)))
            .await?;
        if daily.len() < 2 {
            // Skip the minute request; the run stops here anyway.
            return sample_from_daily_and_minute(symbol, &daily, &[]);
        }
        let minute = self
            .client
            .get_bars(symbol, Timeframe::OneMinute, 1, Some(date))
            .await?;
        sample_from_daily_and_minute(symbol, &daily, &minute)
    }

    fn name(&self) -> &'static str {
        "daily_bar"
    }
}

pub struct HistoricalWindowSource {
    client: YahooChartClient,
}

impl HistoricalWindowSource {
    pub fn new(client: YahooChartClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for HistoricalWindowSource {
    async fn get_price_sample(
        &self,
        symbol: &str,
        _date: NaiveDate,
    ) -> Result<PriceSample, SourceError> {
        let bars = self.client.daily_history(symbol, "2d").await?;
        sample_from_window(symbol, &bars)
    }

    fn name(&self) -> &'static str {
        "historical_window"
    }
}
