//! Types describing the derived, observable state of a room.

use serde::{Deserialize, Serialize};

use crate::{ids::ClientId, network::ProbeOutcome};

/// The room state machine's derived classification, per the members/probe
/// table in the design: membership count crossed with the latest probe
/// result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStateKind {
    Empty,
    Single,
    PairSameLan,
    PairDiffLan,
    PairUnknown,
}

/// Confidence attached to the `same_lan` verdict.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanConfidence {
    None,
    Confirmed,
}

/// The most recent LAN probe outcome recorded against a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastProbe {
    pub probe_id: String,
    pub status: ProbeOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub checked_at_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A member summary as presented to clients and the dashboard observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub client_id: ClientId,
    pub client_type: String,
    pub device_name: String,
    pub joined_at_ms: i64,
}

/// One room's worth of snapshot data, used both for `room_state_changed`
/// and as an element of `room_states_snapshot`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: crate::ids::RoomId,
    pub max_peers: u8,
    pub state: RoomStateKind,
    pub same_lan: bool,
    pub lan_confidence: LanConfidence,
    pub peers: Vec<ClientSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probe: Option<LastProbe>,
}
