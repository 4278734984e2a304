//! A LAN probe request awaiting its first (and only honored) result.

use pairsync_proto::{ClientId, RoomId};

#[derive(Clone, Debug)]
pub struct PendingProbe {
    pub probe_id: String,
    pub room: RoomId,
    pub pc_client_id: ClientId,
    pub app_client_id: ClientId,
    pub requested_at_ms: i64,
    pub timeout_ms: u64,
    pub resolved: bool,
}
