//! Opaque string identifiers used throughout the wire protocol.

use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};

/// A logical device identity, stable across reconnects.
#[derive(
    Clone, Debug, Display, From, Constructor, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque pairing namespace identifier.
#[derive(
    Clone, Debug, Display, From, Constructor, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ID of a single connected socket. A [`ClientId`] may own more than one.
#[derive(Clone, Debug, Display, From, Constructor, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SocketId(pub u64);
