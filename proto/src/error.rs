//! Error codes surfaced to clients over the wire (see `error` server event).

use serde::{Deserialize, Serialize};

/// Error codes the coordinator sends back to the offending socket.
///
/// Errors are always scoped to the single socket that triggered them; they
/// never cause a fan-out or a state mutation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorCode {
    E_BAD_SCHEMA,
    E_BAD_VERSION,
    E_ROLE_DENIED,
    E_PROBE_STALE,
    E_TRANSFER_STATE,
}

/// Failure parsing or normalizing an inbound frame before it ever reaches
/// the signal dispatcher.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("malformed JSON frame: {0}")]
    Malformed(String),
    #[error("unknown event type {0:?}")]
    UnknownEvent(String),
    #[error("schema error in {event:?}: {reason}")]
    BadSchema { event: String, reason: String },
}
