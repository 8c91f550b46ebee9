use thiserror::Error;

/// Why a single request/response cycle produced nothing usable.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    /// Classify a reqwest error into the closest variant.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e)
        }
    }
}
