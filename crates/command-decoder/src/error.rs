//! Decode error types.

use thiserror::Error;

/// Why a payload could not become a [`crate::Command`].
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not a JSON document.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Valid JSON, but the top-level value is not an object.
    #[error("payload must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// `action` is absent, null or blank.
    #[error("payload has no action")]
    MissingAction,

    /// A known field has the wrong JSON type.
    #[error("field `{field}` must be {expected}, found {found}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Result type alias using DecodeError.
pub type DecodeResult<T> = Result<T, DecodeError>;
