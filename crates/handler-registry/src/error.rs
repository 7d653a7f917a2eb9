//! Registry, handler and host error types.

use std::time::Duration;
use thiserror::Error;

/// Lookup and registration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No handler is registered for the action. Bad input, not a bug.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The action name was registered twice.
    #[error("Action already registered: {0}")]
    DuplicateAction(String),

    #[error("Invalid action name: {0:?}")]
    InvalidActionName(String),
}

/// Result type alias using RegistryError.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failures reported by the host that performs handler effects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("No active household")]
    NoActiveHousehold,

    #[error("No active sim")]
    NoActiveSim,

    #[error("No sim found with id {0}")]
    SimNotFound(u64),

    #[error("Buff '{0}' not found")]
    UnknownBuff(String),

    #[error("Household funds would overflow")]
    FundsOverflow,
}

/// A handler's own failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Missing parameter `{0}`")]
    MissingParam(String),

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Handler timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result of one handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            RegistryError::UnknownAction("spawn_object".into()).to_string(),
            "Unknown action: spawn_object"
        );
        assert_eq!(HostError::SimNotFound(9).to_string(), "No sim found with id 9");
        assert_eq!(
            HandlerError::from(HostError::NoActiveHousehold).to_string(),
            "No active household"
        );
        assert_eq!(
            HandlerError::invalid_param("amount", "expected an integer").to_string(),
            "Invalid parameter `amount`: expected an integer"
        );
    }
}
