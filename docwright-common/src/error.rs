use thiserror::Error;

/// Rejected input. Always recoverable and reported back to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// Missing fields, wrong types and unknown enum values (templates
    /// included) reported by serde.
    #[error("invalid request: {0}")]
    Malformed(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}
