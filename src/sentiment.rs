//! Fear & greed style sentiment scores (0-100, low = fear).
//!
//! Every provider scrapes a third party it does not control, so failure is
//! routine: callers treat any error as "no sentiment this run".

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::SourceError;

pub const CNN_GRAPH_URL: &str = "https://production.dataviz.cnn.io/index/fearandgreed/graphdata";

#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// A score in (0, 100]; zero, out-of-range and unparseable values are errors.
    async fn get_sentiment_score(&self) -> Result<f64, SourceError>;

    fn name(&self) -> &'static str;
}

/// Gate every raw score. A raw zero means the page did not load a real value.
pub fn validate_score(raw: f64) -> Result<f64, SourceError> {
    if !raw.is_finite() || raw <= 0.0 || raw > 100.0 {
        return Err(SourceError::DataUnavailable(format!(
            "sentiment score {} outside (0, 100]",
            raw
        )));
    }
    Ok(raw)
}

/// First decimal number in `text`, sign included, e.g. `"Now: 38 (Fear)"` -> 38.0.
pub fn first_number(text: &str) -> Option<f64> {
    let mut start = text.find(|c: char| c.is_ascii_digit())?;
    if text[..start].ends_with(|c: char| c == '-' || c == '+') {
        start -= 1;
    }
    let rest = &text[start..];
    let end = rest
        .char_indices()
        .skip(1)
        .find(|&(_, c)| !(c.is_ascii_digit() || c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

/// Text of the first element matching `selector`, parsed as a score.
pub fn extract_score_from_html(html: &str, selector: &str) -> Result<f64, SourceError> {
    let selector = Selector::parse(selector)
        .map_err(|e| SourceError::Parse(format!("invalid selector '{}': {}", selector, e)))?;
    let document = Html::parse_document(html);
    let Some(element) = document.select(&selector).next() else {
        return Err(SourceError::Parse("sentiment element not found".to_string()));
    };
    let text = element.text().collect::<String>();
    let raw = first_number(&text).ok_or_else(|| {
        SourceError::Parse(format!("sentiment element has no number: '{}'", text.trim()))
    })?;
    validate_score(raw)
}

/// `fear_and_greed.score` from the CNN graph feed.
pub fn extract_score_from_cnn_json(body: &str) -> Result<f64, SourceError> {
    let root: Value = serde_json::from_str(body)?;
    let raw = root
        .get("fear_and_greed")
        .and_then(|fg| fg.get("score"))
        .and_then(Value::as_f64)
        .ok_or_else(|| SourceError::Parse("fear_and_greed.score missing".to_string()))?;
    validate_score(raw)
}

fn build_http(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("failed to build sentiment HTTP client")
}

async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    let response = http.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SourceError::from_status(status.as_u16(), &body));
    }
    Ok(body)
}

/// Sentiment disabled: sizing falls back to the base rule.
pub struct NoSentiment;

#[async_trait]
impl SentimentSource for NoSentiment {
    async fn get_sentiment_score(&self) -> Result<f64, SourceError> {
        Err(SourceError::DataUnavailable(
            "sentiment provider disabled".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

pub struct CnnGraphSource {
    http: reqwest::Client,
    url: String,
}

impl CnnGraphSource {
    pub fn new(url: Option<&str>, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http(user_agent, timeout)?,
            url: url.unwrap_or(CNN_GRAPH_URL).to_string(),
        })
    }
}

#[async_trait]
impl SentimentSource for CnnGraphSource {
    async fn get_sentiment_score(&self) -> Result<f64, SourceError> {
        let body = fetch_text(&self.http, &self.url).await?;
        extract_score_from_cnn_json(&body)
    }

    fn name(&self) -> &'static str {
        "cnn_graph"
    }
}

pub struct HtmlSelectorSource {
    http: reqwest::Client,
    url: String,
    selector: String,
}

impl HtmlSelectorSource {
    pub fn new(url: &str, selector: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http(user_agent, timeout)?,
            url: url.to_string(),
            selector: selector.to_string(),
        })
    }
}

#[async_trait]
impl SentimentSource for HtmlSelectorSource {
    async fn get_sentiment_score(&self) -> Result<f64, SourceError> {
        let body = fetch_text(&self.http, &self.url).await?;
        extract_score_from_html(&body, &self.selector)
    }

    fn name(&self) -> &'static str {
        "html_selector"
    }
}
