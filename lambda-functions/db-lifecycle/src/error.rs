use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that end an invocation. Gate denials and not-yet states are not
/// errors; see [`crate::controller::Outcome`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Caller programming error. Never retried.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} was not found")]
    NotFound(String),

    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl LifecycleError {
    pub fn upstream(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Upstream {
            context: context.into(),
            source: source.into(),
        }
    }
}
