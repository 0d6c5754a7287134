use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::alpaca::rest::calendar_has_session;
use crate::alpaca::AlpacaRestClient;
use crate::error::SourceError;

/// Today's calendar date on the exchange's wall clock.
pub fn today_in(tz: Tz) -> NaiveDate {
    date_in(Utc::now(), tz)
}

pub fn date_in(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

#[async_trait]
pub trait MarketClock: Send + Sync {
    /// Whether `date` is a trading session, or why that could not be confirmed.
    async fn check(&self, date: NaiveDate) -> Result<bool, SourceError>;

    /// Fail-closed view of [`MarketClock::check`]: any failure reads as closed.
    async fn is_market_open(&self, date: NaiveDate) -> bool {
        match self.check(date).await {
            Ok(open) => open,
            Err(e) => {
                tracing::error!(
                    stage = "clock",
                    %date,
                    error = %e,
                    "Calendar lookup failed; treating market as closed"
                );
                false
            }
        }
    }
}

pub struct AlpacaCalendarClock {
    client: Arc<AlpacaRestClient>,
}

impl AlpacaCalendarClock {
    pub fn new(client: Arc<AlpacaRestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketClock for AlpacaCalendarClock {
    async fn check(&self, date: NaiveDate) -> Result<bool, SourceError> {
        let days = self.client.get_calendar(date).await?;
        let open = calendar_has_session(&days, date);
        tracing::debug!(
            stage = "clock",
            %date,
            records = days.len(),
            open,
            "Calendar lookup"
        );
        Ok(open)
    }
}
