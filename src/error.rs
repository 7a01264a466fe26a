//! Error types for vidopt

use thiserror::Error;

/// Result type alias for vidopt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vidopt
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid static configuration. Raised before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The token endpoint answered with a non-success status.
    #[error("Token exchange failed: {status} - {message}")]
    ExchangeFailed { status: u16, message: String },

    /// The analysis endpoint answered with a non-success status.
    #[error("Analysis failed: {status} - {message}")]
    AnalysisFailed { status: u16, message: String },

    /// No response reached us (connect, TLS, timeout, body decode).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An authorized action was attempted without a session token.
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Callback error: {0}")]
    Callback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt failed: {0}")]
    Prompt(String),
}

impl Error {
    /// HTTP status carried by a backend rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ExchangeFailed { status, .. } | Error::AnalysisFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<inquire::InquireError> for Error {
    fn from(err: inquire::InquireError) -> Self {
        Error::Prompt(err.to_string())
    }
}
