//! Error types for the ETL core
//!
//! The taxonomy mirrors the pipeline phases: fetch, parse, validate, load.
//! The orchestrator recovers exactly one case itself (remote "does not
//! exist" statuses during extract); everything else propagates to the
//! caller, and load failures surface as the sink's native `sqlx::Error` so
//! the enclosing transaction can abort.

use thiserror::Error;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// A remote fetch failed
#[derive(Error, Debug)]
pub enum FetchError {
    /// The remote responded with a non-success status
    #[error("remote responded {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The request itself failed (connection, timeout, ...)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether the orchestrator may skip the item and continue the batch
    ///
    /// Remote catalogs routinely omit entries for leagues or periods with no
    /// matches; those show up as 404, or as a 300 from servers that answer
    /// ambiguous paths with a redirect listing. Everything else is fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FetchError::Status { status, .. }
                if *status == reqwest::StatusCode::NOT_FOUND
                    || *status == reqwest::StatusCode::MULTIPLE_CHOICES
        )
    }
}

/// Raw bytes could not be turned into structured data
#[derive(Error, Debug)]
pub enum ParseError {
    /// Empty or single-byte content is rejected before any format logic
    #[error("content too short to parse ({0} bytes)")]
    TooShort(usize),

    #[error("content is not valid {encoding} text")]
    Encoding { encoding: &'static str },

    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed delimited text: {0}")]
    Delimited(#[from] csv::Error),

    #[error("invalid header row: {0}")]
    Header(String),

    #[error("record path '{0}' not found in document")]
    RecordPathMissing(String),

    #[error("record path '{0}' does not hold an array of records")]
    RecordPathNotArray(String),

    /// None of the configured formats matched a date column's values
    #[error("no format in [{formats}] matches dates in column '{column}'")]
    DateFormat { column: String, formats: String },
}

/// A validation rule did not produce its expected result
#[derive(Error, Debug)]
#[error("validation rule '{rule}' expected {expected}, got {actual}")]
pub struct ValidationError {
    pub rule: String,
    pub expected: bool,
    pub actual: bool,
}

/// Top-level error for the ETL core
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Load failures are the sink's native error, not wrapped further
    #[error(transparent)]
    Load(#[from] sqlx::Error),

    /// Cache storage I/O
    #[error("cache storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid dataset configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("work item has no load destination")]
    NoDestination,

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A fan-out callback failed while synthesizing follow-up items
    #[error("fan-out callback failed: {0}")]
    Callback(#[source] anyhow::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_recoverable() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            url: "http://example.com/E0.csv".into(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_multiple_choices_is_recoverable() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::MULTIPLE_CHOICES,
            url: "http://example.com/E0.csv".into(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_server_error_is_fatal() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            url: "http://example.com/E0.csv".into(),
        };
        assert!(!err.is_recoverable());
    }
}
