//! Error type shared by the solvers, estimators, loaders and persistence

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    /// `C`, `tol`, `epsilon` or a kernel parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid labels: {0}")]
    InvalidLabel(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    /// An SMO bookkeeping invariant was broken. Never recoverable.
    #[error("Unexpected solver state: {0}")]
    UnexpectedState(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed LibSVM or CSV input, with the offending line
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A model file that is not valid JSON or does not describe a model
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;
