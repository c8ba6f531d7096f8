//! Error taxonomy for the message layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result alias used throughout the message layer.
pub type Result<T> = std::result::Result<T, NfsError>;

/// Failure of a message-layer operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum NfsError {
    /// Malformed wire bytes, or bytes describing a different message than expected.
    #[error("parsing error: {0}")]
    Parsing(String),
    /// Failure while building a wire message from local values.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The referenced task is not (or no longer) tracked.
    #[error("no such element")]
    NoSuchElement,
    /// The request was not resolved before its deadline.
    #[error("request timed out")]
    Timeout,
    /// A remote holder answered with a return code.
    #[error("remote returned {0}")]
    Remote(ErrorCode),
    /// Content was returned but does not match the name it was requested under.
    #[error("data validation failed: {0}")]
    DataValidation(String),
}

impl NfsError {
    pub(crate) fn parsing(context: impl fmt::Display) -> Self {
        Self::Parsing(context.to_string())
    }

    pub(crate) fn invalid_parameter(context: impl fmt::Display) -> Self {
        Self::InvalidParameter(context.to_string())
    }
}

/// Return code carried in a negative response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The holder does not have the requested item.
    NoSuchElement,
    /// The requester may not read the item.
    PermissionDenied,
    /// The request itself was malformed.
    InvalidParameter,
    /// The holder could not decode the request.
    ParsingError,
    /// Any other failure.
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoSuchElement => "no_such_element",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidParameter => "invalid_parameter",
            Self::ParsingError => "parsing_error",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_names_code() {
        let err = NfsError::Remote(ErrorCode::NoSuchElement);
        assert_eq!(err.to_string(), "remote returned no_such_element");
    }

    #[test]
    fn parsing_and_invalid_parameter_are_distinct() {
        assert_ne!(NfsError::parsing("x"), NfsError::invalid_parameter("x"));
    }
}
