//! Error types for addrgen.

use thiserror::Error;

/// Boxed error returned by external collaborators (corpus index, callbacks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// addrgen error types.
#[derive(Error, Debug)]
pub enum GenError {
    /// Network prefix length is not a whole number of nybbles
    #[error("Invalid prefix length: /{0} (must be divisible by 4 and at most 128)")]
    InvalidPrefixLength(u8),

    /// Malformed address, network or pattern text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration value out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The model holds no clusters to sample from
    #[error("Empty model: no clusters to sample from")]
    EmptyModel,

    /// Unique generation ran out of attempts
    #[error("Generation exhausted: produced {produced} of {requested} unique addresses")]
    GenerationExhausted { requested: usize, produced: usize },

    /// Failure reported by a corpus index or generation callback
    #[error("Collaborator failure: {0}")]
    Collaborator(#[source] BoxError),

    /// I/O error while reading or writing a model or address file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`GenError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied something unusable; no partial result was produced.
    InvalidInput,
    /// A consumed collaborator (index, persistence, callback) failed.
    CollaboratorFailure,
    /// The input was valid but too small to do anything with.
    DegenerateInput,
}

impl GenError {
    /// Wrap a collaborator error.
    pub fn collaborator<E: Into<BoxError>>(err: E) -> Self {
        GenError::Collaborator(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenError::InvalidPrefixLength(_)
            | GenError::InvalidInput(_)
            | GenError::InvalidConfig(_) => ErrorKind::InvalidInput,
            GenError::EmptyModel | GenError::GenerationExhausted { .. } => {
                ErrorKind::DegenerateInput
            }
            GenError::Collaborator(_) | GenError::Io(_) | GenError::Json(_) => {
                ErrorKind::CollaboratorFailure
            }
        }
    }
}

/// Result type alias for addrgen operations.
pub type Result<T> = std::result::Result<T, GenError>;
