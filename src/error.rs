use std::path::PathBuf;

use thiserror::Error;

/// Transport-level failure of a page fetch. Retryable by a later pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Timeout")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_redirect() {
            FetchError::TooManyRedirects
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Failure to load or durably save catalog/ledger state. Aborts the pass.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        source: serde_json::Error,
    },
}

/// Batch checkpoint failure. Logged and skipped.
#[derive(Debug, Error)]
#[error("checkpoint failed: {0}")]
pub struct CheckpointError(pub String);
