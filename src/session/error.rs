use thiserror::Error;

/// Errors emitted by session mutations.
///
/// `InvalidArgument` is a caller bug (bad set index, unknown exercise in a
/// toggle). `NotFound` is recoverable: the swap target is gone and the
/// session was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("exercise '{0}' is not part of this session")]
    NotFound(String),
}
