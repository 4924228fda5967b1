use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine and its task wrappers.
///
/// Cloneable so that every caller coalesced onto one in-flight computation
/// observes the same failure.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("{0} not implemented")]
    NotImplemented(&'static str),

    #[error("Loader failed: {0:#}")]
    Loader(Arc<anyhow::Error>),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Task aborted: {0}")]
    Aborted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap a failure raised by a user-supplied loader, enumerator or scorer.
    pub fn loader<E: Into<anyhow::Error>>(err: E) -> Self {
        Error::Loader(Arc::new(err.into()))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Aborted(err.to_string())
    }
}
