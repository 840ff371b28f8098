use creatorhub_core::ErrorKind;
use thiserror::Error;

/// Failure of a single adapter call, already classified for the aggregator.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("credentials rejected: {0}")]
    AuthExpired(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response for {context}: {reason}")]
    Malformed { context: String, reason: String },
}

impl AdapterError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Timeout => ErrorKind::Timeout,
            AdapterError::RateLimited { .. } => ErrorKind::RateLimited,
            AdapterError::AuthExpired(_) => ErrorKind::AuthExpired,
            AdapterError::Unavailable(_) => ErrorKind::Unavailable,
            AdapterError::Malformed { .. } => ErrorKind::Malformed,
        }
    }

    /// Builds a representative error of the given kind.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match kind {
            ErrorKind::Timeout => AdapterError::Timeout,
            ErrorKind::RateLimited => AdapterError::RateLimited {
                retry_after_secs: None,
            },
            ErrorKind::AuthExpired => AdapterError::AuthExpired(detail),
            ErrorKind::Unavailable => AdapterError::Unavailable(detail),
            ErrorKind::Malformed => AdapterError::Malformed {
                context: detail,
                reason: "synthetic failure".to_string(),
            },
        }
    }

    pub(crate) fn malformed(context: impl Into<String>, reason: impl ToString) -> Self {
        AdapterError::Malformed {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_decode() {
            AdapterError::malformed("response body", &err)
        } else {
            AdapterError::Unavailable(err.to_string())
        }
    }
}
