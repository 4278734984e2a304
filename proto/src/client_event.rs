//! Inbound, client-to-coordinator wire events.

use std::collections::BTreeMap;

use pairsync_macro::dispatchable;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::ProtoError,
    ids::RoomId,
    network::{NetworkInfo, ProbeInfo},
};

/// Message from a client socket to the coordinator.
///
/// Tagged on the `type` field. Handlers are generated by `#[dispatchable]`
/// as the `ClientEventHandler` trait; the signal dispatcher implements it.
#[dispatchable]
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        room: RoomId,
        client_id: String,
        #[serde(default)]
        client_type: Option<String>,
        #[serde(default)]
        device_name: Option<String>,
        #[serde(default)]
        network: Option<NetworkInfo>,
        #[serde(default)]
        probe: Option<ProbeInfo>,
    },
    Leave {
        room: RoomId,
    },
    PeerNetworkUpdate {
        #[serde(default)]
        room: Option<RoomId>,
        #[serde(default)]
        client_id: Option<String>,
        network: NetworkInfo,
    },
    LanProbeResult {
        room: RoomId,
        #[serde(default)]
        probe_id: Option<String>,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        latency_ms: Option<u64>,
        #[serde(default)]
        reason: Option<String>,
    },
    ClipboardPush {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FilePush {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileAnnouncement {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileAck {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileRequestRelay {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        #[serde(flatten)]
        payload: BTreeMap<String, Value>,
    },
    FileAvailable {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        file_id: String,
        filename: String,
        #[serde(default)]
        transfer_id: Option<String>,
        #[serde(default)]
        decision_timeout_ms: Option<u64>,
    },
    FileSyncCompleted {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        file_id: String,
        #[serde(default)]
        transfer_id: Option<String>,
        method: String,
    },
    FileNeedRelay {
        room: RoomId,
        #[serde(default)]
        protocol_version: Option<String>,
        file_id: String,
        #[serde(default)]
        transfer_id: Option<String>,
        reason: String,
    },
}

impl ClientEvent {
    /// Parses a raw inbound frame.
    ///
    /// Payloads may carry their fields flat (sibling to `type`) or nested
    /// once under a `data` object; this flattens the latter into the former
    /// before tag-dispatching, since a top-level key always wins over a
    /// same-named nested one.
    pub fn parse(raw: &[u8]) -> Result<Self, ProtoError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| ProtoError::Malformed(e.to_string()))?;
        let flattened = flatten_envelope(value)?;
        let event_name = flattened
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_owned();
        serde_json::from_value(flattened).map_err(|e| ProtoError::BadSchema {
            event: event_name,
            reason: e.to_string(),
        })
    }
}

/// Flattens a `{type, data: {...}, ...}` or already-flat `{type, ...}` frame
/// into one flat object, nested `data` filling in any keys the top level
/// didn't already provide.
fn flatten_envelope(value: Value) -> Result<Value, ProtoError> {
    let mut obj = match value {
        Value::Object(map) => map,
        other => {
            return Err(ProtoError::Malformed(format!(
                "expected a JSON object, got {other}"
            )))
        }
    };
    if let Some(Value::Object(nested)) = obj.remove("data") {
        for (k, v) in nested {
            obj.entry(k).or_insert(v);
        }
    }
    Ok(Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_join() {
        let raw = br#"{"type":"join","room":"R","client_id":"A","client_type":"pc"}"#;
        let ev = ClientEvent::parse(raw).unwrap();
        assert!(matches!(ev, ClientEvent::Join { .. }));
    }

    #[test]
    fn flattens_nested_data() {
        let raw = br#"{
            "type":"file_available",
            "room":"R",
            "data":{"file_id":"f1","filename":"x.bin"}
        }"#;
        let ev = ClientEvent::parse(raw).unwrap();
        match ev {
            ClientEvent::FileAvailable { file_id, filename, .. } => {
                assert_eq!(file_id, "f1");
                assert_eq!(filename, "x.bin");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn top_level_wins_over_nested_data() {
        let raw = br#"{
            "type":"leave",
            "room":"top",
            "data":{"room":"nested"}
        }"#;
        let ev = ClientEvent::parse(raw).unwrap();
        match ev {
            ClientEvent::Leave { room } => assert_eq!(room.as_str(), "top"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_event_type() {
        let raw = br#"{"type":"not_a_real_event","room":"R"}"#;
        assert!(ClientEvent::parse(raw).is_err());
    }
}
