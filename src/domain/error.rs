//! Engine errors
//!
//! Validation and not-found conditions are ordinary results the UI renders
//! inline. Illegal handover transitions indicate a caller bug.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal handover transition: cannot {action} while {from}")]
    IllegalTransition { from: &'static str, action: &'static str },

    #[error("{action} is locked while a duty handover is pending")]
    HandoverLocked { action: &'static str },
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EngineError::IllegalTransition { from: "idle", action: "accept" };
        assert_eq!(err.to_string(), "illegal handover transition: cannot accept while idle");

        let err = EngineError::HandoverLocked { action: "verify" };
        assert_eq!(err.to_string(), "verify is locked while a duty handover is pending");
    }
}
