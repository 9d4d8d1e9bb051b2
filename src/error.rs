//! Custom error types for rustpapers.
//!
//! Every fallible library function returns `Result<T, PapersError>`.
//! Source failures are recovered by the orchestrator; only the serving path and
//! the storage sink hand errors back to their caller.

use thiserror::Error;

/// Main error type for rustpapers operations.
#[derive(Debug, Error)]
pub enum PapersError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed upstream payload
    #[error("Parse error: {0}")]
    Parse(String),

    /// Atom/XML decoding error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status or API error code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// Topic code not present in the catalog
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Storage sink or store query failure
    #[error("Store error: {0}")]
    Store(String),

    /// Classification capability failure
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl PapersError {
    /// True for the not-found style rejection of an invalid topic code.
    pub fn is_unknown_topic(&self) -> bool {
        matches!(self, PapersError::UnknownTopic(_))
    }
}

/// Result type alias using `PapersError`
pub type Result<T> = std::result::Result<T, PapersError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PapersError::Parse(msg.to_string()))
    }
}
