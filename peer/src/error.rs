//! Error types for the peer crate.

use thiserror::Error;

/// Result type for peer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can surface while running a peer.
///
/// A unit being eliminated is not an error; it is ordinary simulation state.
#[derive(Debug, Error)]
pub enum Error {
    /// The peer at `address` could not be contacted or dropped the call.
    /// Callers absorb this as "that unit is gone"; nothing is retried.
    #[error("peer {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// Startup parameters are unusable. Fatal before any network activity.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The promotion call to the chosen successor failed, so nobody is left
    /// to drive the rounds and no winner can be declared.
    #[error("hand-off to unit {successor} at {address} failed: {reason}")]
    UndefinedOutcome {
        successor: u32,
        address: String,
        reason: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl Error {
    pub fn unreachable(address: &str, reason: impl ToString) -> Self {
        Error::Unreachable {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }
}
