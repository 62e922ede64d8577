use thiserror::Error;

/// Uniform failure shape for every backend call.
///
/// `Clone` so a single failed compute can be handed to every single-flight waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Reply parse error: {0}")]
    Parse(String),

    #[error("Backend call timed out after {0} ms")]
    Timeout(u64),

    #[error("Backend call cancelled")]
    Cancelled,

    #[error("Fingerprint error: {0}")]
    Fingerprint(String),
}

impl BackendError {
    /// Network, auth, or deadline failures reaching the backend.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BackendError::Transport(_) | BackendError::Timeout(_) | BackendError::Cancelled
        )
    }

    /// The backend answered but the reply did not match the expected shape.
    pub fn is_parse(&self) -> bool {
        matches!(self, BackendError::Parse(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            BackendError::Parse(format!("undecodable reply body: {e}"))
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

impl From<metron_cache::CacheError> for BackendError {
    fn from(e: metron_cache::CacheError) -> Self {
        BackendError::Fingerprint(e.to_string())
    }
}
