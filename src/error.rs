//! Error types for the vitals observability subsystem

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while sampling, exporting or probing
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Raw sample or resource-usage source could not be read
    #[error("Source read failed for {source_name}: {reason}")]
    SourceRead { source_name: String, reason: String },

    /// Export sink rejected a registration
    #[error("Metric export error: {0}")]
    Export(#[from] prometheus::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// WebSocket handshake failed
    #[error("Handshake failed: {0}")]
    Handshake(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(#[from] sqlx::Error),

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {duration}")]
    Timeout { operation: String, duration: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a source-read error
    pub fn source_read(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SourceRead {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Build a timeout error
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration: format!("{:?}", duration),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Handshake(Box::new(e))
    }
}
