//! Protocol-level errors.
//!
//! These are the error kinds that are reported back to the immediate caller
//! (spec §7). `PeerUnreachable` is deliberately not a variant here: it is
//! never surfaced to a client, only logged at the call site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("This node is not primary. Writes and reads must go to the primary node.")]
    NotPrimary,

    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Stale term")]
    StaleTerm { current_term: u64 },

    #[error("Already voted")]
    AlreadyVoted,
}
