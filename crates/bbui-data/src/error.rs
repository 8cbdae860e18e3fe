use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("session refused to open a subscription: {reason}")]
    OpenRefused { reason: String },

    #[error("fetch from {endpoint} failed: {reason}")]
    FetchFailed { endpoint: String, reason: String },

    #[error("subscription handle {handle} was already released")]
    HandleReleased { handle: u64 },
}

impl DataError {
    #[must_use]
    pub fn open_refused(reason: impl Into<String>) -> Self {
        Self::OpenRefused {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn fetch_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}
