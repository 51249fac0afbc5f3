use thiserror::Error;
use vistet_core::FieldErrors;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The catalog service answered 4xx. `fields` holds its per-field
    /// messages when the body carried them.
    #[error("catalog rejected submission ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        fields: FieldErrors,
    },
}

impl ScraperError {
    /// Per-field messages from a catalog rejection, if any.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Rejected { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}
