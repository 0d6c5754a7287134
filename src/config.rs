use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::model::order::TimeInForce;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alpaca: AlpacaConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub yahoo: YahooConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaConfig {
    #[serde(default = "default_trading_base_url")]
    pub trading_base_url: String,
    #[serde(default = "default_data_base_url")]
    pub data_base_url: String,
    #[serde(default = "default_feed")]
    pub feed: String,
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub api_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceKind {
    /// Last two daily bars plus the latest 1-minute bar from the brokerage data API.
    DailyBar,
    /// 2-day daily history from the Yahoo chart API.
    HistoricalWindow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_base_rate")]
    pub base_rate: f64,
    #[serde(default = "default_price_source")]
    pub price_source: PriceSourceKind,
    #[serde(default = "default_time_in_force")]
    pub time_in_force: String,
    #[serde(default = "default_exchange_timezone")]
    pub exchange_timezone: String,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentProviderKind {
    None,
    CnnGraph,
    HtmlSelector,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    #[serde(default = "default_sentiment_provider")]
    pub provider: SentimentProviderKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooConfig {
    #[serde(default = "default_yahoo_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_trading_base_url() -> String {
    "https://paper-api.alpaca.markets".to_string()
}

fn default_data_base_url() -> String {
    "https://data.alpaca.markets".to_string()
}

fn default_feed() -> String {
    "iex".to_string()
}

fn default_symbol() -> String {
    "VOO".to_string()
}

fn default_base_rate() -> f64 {
    crate::sizing::DEFAULT_BASE_RATE
}

fn default_price_source() -> PriceSourceKind {
    PriceSourceKind::DailyBar
}

fn default_time_in_force() -> String {
    "day".to_string()
}

fn default_exchange_timezone() -> String {
    "America/New_York".to_string()
}

fn default_sentiment_provider() -> SentimentProviderKind {
    SentimentProviderKind::None
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)".to_string()
}

fn default_yahoo_base_url() -> String {
    "https://query2.finance.yahoo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            trading_base_url: default_trading_base_url(),
            data_base_url: default_data_base_url(),
            feed: default_feed(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            base_rate: default_base_rate(),
            price_source: default_price_source(),
            time_in_force: default_time_in_force(),
            exchange_timezone: default_exchange_timezone(),
            dry_run: false,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            provider: default_sentiment_provider(),
            url: None,
            selector: None,
        }
    }
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: default_yahoo_base_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AlpacaConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl StrategyConfig {
    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_ascii_uppercase()
    }

    pub fn exchange_tz(&self) -> Result<Tz> {
        self.exchange_timezone
            .parse::<Tz>()
            .map_err(|e| {
                anyhow::anyhow!(
                    "invalid exchange_timezone '{}': {}",
                    self.exchange_timezone,
                    e
                )
            })
    }

    pub fn time_in_force(&self) -> Result<TimeInForce> {
        self.time_in_force.parse()
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn load_from(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Secrets and run-level overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.alpaca.api_key = std::env::var("ALPACA_API_KEY").unwrap_or_default();
        self.alpaca.api_secret = std::env::var("ALPACA_SECRET_KEY").unwrap_or_default();

        if let Ok(symbol) = std::env::var("DIPBUY_SYMBOL") {
            if !symbol.trim().is_empty() {
                self.strategy.symbol = symbol;
            }
        }
        if let Some(dry_run) = std::env::var("DIPBUY_DRY_RUN")
            .ok()
            .as_deref()
            .and_then(parse_bool_flag)
        {
            self.strategy.dry_run = dry_run;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.strategy.normalized_symbol().is_empty() {
            bail!("strategy.symbol must not be empty");
        }
        if !self.strategy.base_rate.is_finite() || self.strategy.base_rate <= 0.0 {
            bail!(
                "strategy.base_rate must be a positive number, got {}",
                self.strategy.base_rate
            );
        }
        self.strategy
            .exchange_tz()
            .context("strategy.exchange_timezone is invalid")?;
        self.strategy
            .time_in_force()
            .context("strategy.time_in_force is invalid")?;

        for (field, value) in [
            ("alpaca.trading_base_url", &self.alpaca.trading_base_url),
            ("alpaca.data_base_url", &self.alpaca.data_base_url),
            ("yahoo.base_url", &self.yahoo.base_url),
        ] {
            url::Url::parse(value).with_context(|| format!("{} is not a valid URL", field))?;
        }

        match self.sentiment.provider {
            SentimentProviderKind::None | SentimentProviderKind::CnnGraph => {}
            SentimentProviderKind::HtmlSelector => {
                if self.sentiment.url.is_none() {
                    bail!("sentiment.url is required for the html_selector provider");
                }
                let Some(selector) = self.sentiment.selector.as_deref() else {
                    bail!("sentiment.selector is required for the html_selector provider");
                };
                scraper::Selector::parse(selector).map_err(|e| {
                    anyhow::anyhow!("sentiment.selector '{}' is invalid: {}", selector, e)
                })?;
            }
        }
        if let Some(url) = self.sentiment.url.as_deref() {
            url::Url::parse(url).context("sentiment.url is not a valid URL")?;
        }
        Ok(())
    }
}
