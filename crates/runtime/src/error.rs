use thiserror::Error;

/// Why a session could not be read or written.
///
/// The variants are kept apart for logs only. At the boundary all of them render as
/// the same "not found or unavailable" answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("session {0} does not exist")]
    NotFound(String),
    #[error("principal {principal} may not access session {session_id}")]
    Denied { session_id: String, principal: String },
    #[error("authentication required")]
    AuthenticationRequired,
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("generation backend unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl StoryError {
    pub fn persistence(err: impl Into<anyhow::Error>) -> Self {
        StoryError::Persistence(err.into())
    }

    /// True for errors that must look like "not found" to the caller. Anonymous reads of
    /// private sessions get the same answer as missing ones.
    pub fn is_concealed(&self) -> bool {
        matches!(self, StoryError::Access(_))
    }
}
