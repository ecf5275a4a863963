// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK-specific error types.

use thiserror::Error;

use crate::types::{ClockAction, SessionPhase};

/// Errors that can occur in the SDK.
///
/// Façade operations propagate these to the caller unrecovered; since the
/// façade performs no partial mutation on failure, every error is safe to
/// surface as "retry". Reconciliation errors are logged and swallowed by the
/// background triggers and only reach callers through
/// [`force_sync`](crate::ShiftClock::force_sync).
#[derive(Debug, Error)]
pub enum ClockError {
    /// No resolved identity; the UI should redirect to login.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Identity resolved but no active company membership found.
    #[error("no active company membership")]
    NoCompanyContext,

    /// `end()` found no open clock-in in the remote store.
    #[error("no active session found")]
    NoActiveSession,

    /// Operation not permitted in the current session phase.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        /// Phase the session was in when the action was attempted.
        from: SessionPhase,
        /// The rejected action.
        action: ClockAction,
    },

    /// Appending to the remote event store failed; local state is unchanged.
    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    /// Remote query or other backend operation failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// Configuration error (invalid environment variable or builder input).
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ClockError {
    fn from(err: serde_json::Error) -> Self {
        ClockError::Serialization(err.to_string())
    }
}

/// Type alias for SDK results.
pub type Result<T> = std::result::Result<T, ClockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let err = ClockError::InvalidTransition {
            from: SessionPhase::Out,
            action: ClockAction::Pause,
        };
        assert_eq!(err.to_string(), "cannot pause while out");
    }

    #[test]
    fn test_remote_write_display() {
        let err = ClockError::RemoteWrite("connection refused".to_string());
        assert_eq!(err.to_string(), "remote write failed: connection refused");
    }
}
