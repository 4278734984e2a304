//! A room's persisted state: membership order and the latest probe result.
//!
//! Everything else about a room (its `RoomStateKind`, `same_lan`,
//! `lan_confidence`) is a pure projection computed on demand; see
//! [`crate::room_state`].

use pairsync_proto::{ClientId, LastProbe};

#[derive(Clone, Debug, Default)]
pub struct Room {
    /// Join order; also the eviction tie-break order.
    pub members: Vec<ClientId>,
    pub last_probe: Option<LastProbe>,
}
