//! Error types.
//!
//! - `AppError`: process-level failures that map to an exit code
//! - `FetchError`: why a single (maturity, source) fetch failed
//! - `ParseError`: a rate or date token could not be interpreted

use thiserror::Error;

use crate::domain::Maturity;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure to interpret a free-text rate or date token.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("no numeric data found in '{input}'")]
    EmptyRate { input: String },

    #[error("cannot parse '{cleaned}' (from '{input}') as a rate: {source}")]
    InvalidRate {
        input: String,
        cleaned: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("could not parse date '{input}'")]
    InvalidDate {
        input: String,
        /// Error reported by the last layout attempted.
        #[source]
        source: Option<chrono::ParseError>,
    },
}

/// Why fetching one maturity from one source failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not have the expected shape.
    #[error("unexpected response format: {0}")]
    Format(String),

    /// No recognizable rate data in an HTML document.
    #[error("{message}")]
    Extraction {
        message: String,
        #[source]
        source: Option<ParseError>,
    },

    #[error("maturity {0} is not supported by this source")]
    UnsupportedMaturity(Maturity),
}

impl FetchError {
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
            source: None,
        }
    }

    /// Skips are not failures: the orchestrator counts them separately.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::UnsupportedMaturity(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
