use thiserror::Error;

/// Failure of an external collaborator (calendar, bars, sentiment page, order endpoint).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("credentials rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("request rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// The "skip this run" sentinel: not enough data rather than a broken call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::DataUnavailable(_))
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = compact_error_body(body);
        if status == 401 || status == 403 {
            SourceError::Auth { status, body }
        } else {
            SourceError::Rejected { status, body }
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

pub fn compact_error_body(body: &str) -> String {
    let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() > 180 {
        let head: String = normalized.chars().take(180).collect();
        format!("{}...", head)
    } else {
        normalized
    }
}
