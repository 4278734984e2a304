//! Outbound, coordinator-to-client wire events.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::ErrorCode,
    ids::{ClientId, RoomId},
    room_state::{ClientSummary, LanConfidence, LastProbe, RoomSnapshot, RoomStateKind},
};

/// Action a `transfer_command` instructs the sender to take.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    UploadRelay,
    Finish,
}

/// Message from the coordinator to a client socket.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Status {
        message: String,
    },
    Error {
        code: ErrorCode,
        msg: String,
    },
    RoomStats {
        room: RoomId,
        count: usize,
        clients: Vec<ClientSummary>,
    },
    RoomStateChanged {
        protocol_version: &'static str,
        room: RoomId,
        max_peers: u8,
        state: RoomStateKind,
        same_lan: bool,
        lan_confidence: LanConfidence,
        peers: Vec<ClientSummary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_probe: Option<LastProbe>,
    },
    RoomStatesSnapshot {
        rooms: Vec<RoomSnapshot>,
    },
    PeerEvicted {
        room: RoomId,
        evicted_client_id: ClientId,
        reason: String,
        evicted_at_ms: i64,
    },
    LanProbeRequest {
        room: RoomId,
        probe_id: String,
        provider_client_id: ClientId,
        probe_url: String,
        timeout_ms: u64,
        requested_at_ms: i64,
    },
    TransferCommand {
        room: RoomId,
        transfer_id: String,
        file_id: String,
        action: TransferAction,
        reason: String,
        issued_at_ms: i64,
    },
    ClipboardSync {
        room: RoomId,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileSync {
        room: RoomId,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileAnnouncement {
        room: RoomId,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileAck {
        room: RoomId,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileRequestRelay {
        room: RoomId,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileAvailable {
        room: RoomId,
        file_id: String,
        filename: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        transfer_id: Option<String>,
    },
    FileSyncCompleted {
        room: RoomId,
        file_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        transfer_id: Option<String>,
        method: String,
    },
    FileNeedRelay {
        room: RoomId,
        file_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        transfer_id: Option<String>,
        reason: String,
    },
    ActivityLog {
        #[serde(rename = "log_type")]
        log_type: String,
        room: RoomId,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender: Option<ClientId>,
        content: Value,
    },
}

impl ServerEvent {
    /// Serializes to the JSON text sent over the socket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .expect("ServerEvent always serializes")
    }
}
