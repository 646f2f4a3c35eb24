//! Error types shared by the engine, the stores and the HTTP layer.

use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Malformed input rejected before any state is touched.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already tracked: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The persistence endpoint answered with a failure or could not be reached.
    #[error("Store error: {0}")]
    Remote(String),

    /// Market data could not be fetched for one token.
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DashboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote(e.to_string())
    }
}
