//! One run: clock gate -> price signal -> sentiment -> sizing -> submission.
//!
//! Every collaborator failure is caught where it happens, logged with a
//! `stage` field, and turned into a [`RunOutcome`]. Nothing is retried and the
//! submitter is called at most once.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;

use crate::alpaca::AlpacaRestClient;
use crate::clock::{AlpacaCalendarClock, MarketClock};
use crate::config::{Config, PriceSourceKind, SentimentProviderKind};
use crate::error::SourceError;
use crate::execution::{AlpacaSubmitter, DryRunSubmitter, OrderSubmitter};
use crate::model::order::{OrderAck, OrderRequest, TimeInForce};
use crate::model::price::PriceSample;
use crate::price::{DailyBarSource, HistoricalWindowSource, PriceSource};
use crate::sentiment::{CnnGraphSource, HtmlSelectorSource, NoSentiment, SentimentSource};
use crate::sizing::{sentiment_multiplier, size_order};
use crate::yahoo::YahooChartClient;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub symbol: String,
    pub base_rate: f64,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    CalendarUnavailable {
        reason: String,
    },
    MarketClosed {
        date: NaiveDate,
    },
    PriceUnavailable {
        reason: String,
    },
    NoDip {
        sample: PriceSample,
    },
    ZeroQuantity {
        sample: PriceSample,
        sentiment: Option<f64>,
    },
    Submitted {
        order: OrderRequest,
        ack: OrderAck,
        percent_change: f64,
        sentiment: Option<f64>,
    },
    SubmitFailed {
        order: OrderRequest,
        reason: String,
    },
}

impl RunOutcome {
    pub fn placed_order(&self) -> bool {
        matches!(self, RunOutcome::Submitted { .. })
    }

    /// The stage that ended the run.
    pub fn stage(&self) -> &'static str {
        match self {
            RunOutcome::CalendarUnavailable { .. } | RunOutcome::MarketClosed { .. } => "clock",
            RunOutcome::PriceUnavailable { .. } => "price",
            RunOutcome::NoDip { .. } | RunOutcome::ZeroQuantity { .. } => "sizing",
            RunOutcome::Submitted { .. } | RunOutcome::SubmitFailed { .. } => "submit",
        }
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::CalendarUnavailable { reason } => {
                write!(f, "[clock] calendar unavailable, no order: {}", reason)
            }
            RunOutcome::MarketClosed { date } => {
                write!(f, "[clock] market closed on {}, no order", date)
            }
            RunOutcome::PriceUnavailable { reason } => {
                write!(f, "[price] price data unavailable, no order: {}", reason)
            }
            RunOutcome::NoDip { sample } => write!(
                f,
                "[sizing] {} {:+.2}% since previous close ({:.2} -> {:.2}), no dip, no order",
                sample.symbol,
                sample.percent_change(),
                sample.previous_close,
                sample.current_price
            ),
            RunOutcome::ZeroQuantity { sample, .. } => write!(
                f,
                "[sizing] {} {:+.2}% rounds to zero quantity, no order",
                sample.symbol,
                sample.percent_change()
            ),
            RunOutcome::Submitted {
                order,
                ack,
                percent_change,
                sentiment,
            } => {
                write!(f, "[submit] {} ({:+.2}%", order, percent_change)?;
                if let Some(score) = sentiment {
                    write!(f, ", sentiment {:.1}", score)?;
                }
                write!(f, ") accepted: id={} status={}", ack.id, ack.status)
            }
            RunOutcome::SubmitFailed { order, reason } => {
                write!(f, "[submit] {} failed: {}", order, reason)
            }
        }
    }
}

pub struct Pipeline {
    clock: Box<dyn MarketClock>,
    prices: Box<dyn PriceSource>,
    sentiment: Box<dyn SentimentSource>,
    submitter: Box<dyn OrderSubmitter>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        clock: Box<dyn MarketClock>,
        prices: Box<dyn PriceSource>,
        sentiment: Box<dyn SentimentSource>,
        submitter: Box<dyn OrderSubmitter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            clock,
            prices,
            sentiment,
            submitter,
            settings,
        }
    }

    /// Wire the configured collaborators. `dry_run` swaps in a submitter that never sends.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let timeout = config.http.timeout();
        let alpaca = Arc::new(AlpacaRestClient::new(&config.alpaca, timeout)?);

        let prices: Box<dyn PriceSource> = match config.strategy.price_source {
            PriceSourceKind::DailyBar => Box::new(DailyBarSource::new(alpaca.clone())),
            PriceSourceKind::HistoricalWindow => Box::new(HistoricalWindowSource::new(
                YahooChartClient::new(
                    &config.yahoo.base_url,
                    &config.http.user_agent,
                    timeout,
                )?,
            )),
        };

        let sentiment: Box<dyn SentimentSource> = match config.sentiment.provider {
            SentimentProviderKind::None => Box::new(NoSentiment),
            SentimentProviderKind::CnnGraph => Box::new(CnnGraphSource::new(
                config.sentiment.url.as_deref(),
                &config.http.user_agent,
                timeout,
            )?),
            SentimentProviderKind::HtmlSelector => {
                let url = config.sentiment.url.as_deref().unwrap_or_default();
                let selector = config.sentiment.selector.as_deref().unwrap_or_default();
                Box::new(HtmlSelectorSource::new(
                    url,
                    selector,
                    &config.http.user_agent,
                    timeout,
                )?)
            }
        };

        let submitter: Box<dyn OrderSubmitter> = if dry_run || config.strategy.dry_run {
            Box::new(DryRunSubmitter)
        } else {
            Box::new(AlpacaSubmitter::new(alpaca.clone()))
        };

        let settings = PipelineSettings {
            symbol: config.strategy.normalized_symbol(),
            base_rate: config.strategy.base_rate,
            time_in_force: config.strategy.time_in_force()?,
        };

        Ok(Self::new(
            Box::new(AlpacaCalendarClock::new(alpaca)),
            prices,
            sentiment,
            submitter,
            settings,
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Sentiment score, or `None` when the provider cannot supply a trustworthy one.
    pub async fn sentiment(&self) -> Option<f64> {
        match self.sentiment.get_sentiment_score().await {
            Ok(score) if sentiment_multiplier(score).is_some() => {
                tracing::info!(
                    stage = "sentiment",
                    provider = self.sentiment.name(),
                    score,
                    "Sentiment score"
                );
                Some(score)
            }
            Ok(score) => {
                tracing::warn!(
                    stage = "sentiment",
                    provider = self.sentiment.name(),
                    score,
                    "Sentiment score out of range; sizing without it"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    stage = "sentiment",
                    provider = self.sentiment.name(),
                    error = %e,
                    "Sentiment unavailable; sizing without it"
                );
                None
            }
        }
    }

    pub async fn run(&self, date: NaiveDate) -> RunOutcome {
        let symbol = self.settings.symbol.as_str();

        match self.clock.check(date).await {
            Ok(true) => {
                tracing::info!(stage = "clock", %date, "Market open");
            }
            Ok(false) => {
                tracing::info!(stage = "clock", %date, "Market closed");
                return RunOutcome::MarketClosed { date };
            }
            Err(e) => {
                tracing::error!(
                    stage = "clock",
                    %date,
                    error = %e,
                    "Calendar lookup failed; treating market as closed"
                );
                return RunOutcome::CalendarUnavailable {
                    reason: e.to_string(),
                };
            }
        }

        let sample = match self.prices.get_price_sample(symbol, date).await {
            Ok(sample) => sample,
            Err(e) => {
                if e.is_unavailable() {
                    tracing::warn!(
                        stage = "price",
                        provider = self.prices.name(),
                        symbol,
                        error = %e,
                        "Not enough price data; skipping run"
                    );
                } else {
                    tracing::error!(
                        stage = "price",
                        provider = self.prices.name(),
                        symbol,
                        error = %e,
                        "Price lookup failed"
                    );
                }
                return RunOutcome::PriceUnavailable {
                    reason: e.to_string(),
                };
            }
        };
        let percent_change = sample.percent_change();
        tracing::info!(
            stage = "price",
            symbol,
            previous_close = sample.previous_close,
            current_price = sample.current_price,
            percent_change,
            "Price sample"
        );

        if percent_change >= 0.0 {
            return RunOutcome::NoDip { sample };
        }

        let sentiment = self.sentiment().await;
        let quantity = size_order(percent_change, sentiment, self.settings.base_rate);
        tracing::info!(stage = "sizing", percent_change, ?sentiment, quantity, "Order sized");
        if quantity <= 0.0 {
            return RunOutcome::ZeroQuantity { sample, sentiment };
        }

        let order =
            match OrderRequest::market_buy(symbol, quantity, self.settings.time_in_force) {
                Ok(order) => order,
                Err(e) => {
                    tracing::error!(stage = "sizing", error = %e, "Could not build order");
                    return RunOutcome::ZeroQuantity { sample, sentiment };
                }
            };

        match self.submitter.submit_order(&order).await {
            Ok(ack) => {
                tracing::info!(
                    stage = "submit",
                    id = %ack.id,
                    status = %ack.status,
                    "Order accepted"
                );
                RunOutcome::Submitted {
                    order,
                    ack,
                    percent_change,
                    sentiment,
                }
            }
            Err(e) => {
                tracing::error!(stage = "submit", error = %e, "Order failed");
                RunOutcome::SubmitFailed {
                    order,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Everything `run` would compute, without placing an order.
    pub async fn preview(&self, date: NaiveDate) -> Preview {
        let market_open = self.clock.check(date).await.map_err(|e| e.to_string());
        let sample = self
            .prices
            .get_price_sample(&self.settings.symbol, date)
            .await
            .map_err(|e| e.to_string());
        let sentiment = self.sentiment().await;
        let quantity = sample
            .as_ref()
            .ok()
            .map(|s| size_order(s.percent_change(), sentiment, self.settings.base_rate));
        Preview {
            date,
            market_open,
            sample,
            sentiment,
            quantity,
        }
    }

    /// Direct single order outside the sizing policy.
    pub async fn submit_manual(&self, order: &OrderRequest) -> Result<OrderAck, SourceError> {
        self.submitter.submit_order(order).await
    }
}

#[derive(Debug, Clone)]
pub struct Preview {
    pub date: NaiveDate,
    pub market_open: Result<bool, String>,
    pub sample: Result<PriceSample, String>,
    pub sentiment: Option<f64>,
    pub quantity: Option<f64>,
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.market_open {
            Ok(open) => writeln!(
                f,
                "date:        {} ({})",
                self.date,
                if *open { "open" } else { "closed" }
            )?,
            Err(e) => writeln!(f, "date:        {} (calendar unavailable: {})", self.date, e)?,
        }
        match &self.sample {
            Ok(s) => writeln!(
                f,
                "price:       {} {:.2} -> {:.2} ({:+.2}%)",
                s.symbol,
                s.previous_close,
                s.current_price,
                s.percent_change()
            )?,
            Err(e) => writeln!(f, "price:       unavailable: {}", e)?,
        }
        match self.sentiment {
            Some(score) => writeln!(f, "sentiment:   {:.1}", score)?,
            None => writeln!(f, "sentiment:   unavailable")?,
        }
        match self.quantity {
            Some(q) => write!(f, "quantity:    {:.4}", q),
            None => write!(f, "quantity:    n/a"),
        }
    }
}
