//! Domain error taxonomy

use thiserror::Error;

/// Errors surfaced by the consensus and memory subsystems.
///
/// Every public operation classifies its failures into one of these
/// variants so callers can react uniformly regardless of which
/// collaborator misbehaved underneath.
#[derive(Error, Debug)]
pub enum HiveError {
    /// The referenced proposal or key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed vote, bad threshold, or a vote after the deadline
    #[error("Invalid: {0}")]
    Invalid(String),

    /// A peer fetch or transport call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A durable-store or peer-transport call failed
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Unexpected defect
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HiveError {
    /// Check whether this error means the target simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, HiveError::NotFound(_))
    }

    /// Check whether this error was caused by invalid caller input
    pub fn is_invalid(&self) -> bool {
        matches!(self, HiveError::Invalid(_))
    }

    /// Check whether this error is a transient transport-level failure
    /// (timeout or transport), i.e. worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, HiveError::Timeout(_) | HiveError::Transport(_))
    }
}
