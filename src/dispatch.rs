//! Validates and authorizes inbound events, fans them out to a room, and
//! feeds `file_available`/`file_sync_completed`/`file_need_relay` onward
//! to the transfer state machine.

use std::collections::BTreeMap;

use actix::Context;
use pairsync_proto::{
    ClientEventHandler, ClientId, ErrorCode, NetworkInfo, ProbeInfo, RoomId, ServerEvent,
    PROTOCOL_VERSION,
};
use serde_json::Value;

use crate::registry::Registry;

pub struct SignalDispatcher<'a> {
    pub registry: &'a mut Registry,
    pub ctx: &'a mut Context<Registry>,
    pub sid: u64,
}

impl SignalDispatcher<'_> {
    fn reply_error(&self, code: ErrorCode, msg: impl Into<String>) {
        self.registry.send_to_sid(self.sid, ServerEvent::Error { code, msg: msg.into() });
    }

    /// Steps 1–3 of the common validation pipeline: resolve the effective
    /// room (falling back to the sender's tracked room), check
    /// `protocol_version`, and authorize the sender as a room member.
    /// Returns the resolved `(room, sender_client_id)` or `None` after
    /// having already replied with the appropriate error.
    fn authorize(&mut self, room: Option<RoomId>, protocol_version: Option<String>) -> Option<(RoomId, ClientId)> {
        let Some(sender) = self.registry.client_of_sid(self.sid) else {
            self.reply_error(ErrorCode::E_ROLE_DENIED, "socket has not joined a room");
            return None;
        };

        let room = room.or_else(|| self.registry.client_room(&sender))?;

        if let Some(pv) = protocol_version {
            if !pv.is_empty() && pv != PROTOCOL_VERSION {
                self.reply_error(ErrorCode::E_BAD_VERSION, format!("unsupported protocol_version {pv:?}"));
                return None;
            }
        }

        if !self.registry.is_member(&room, &sender) {
            self.reply_error(ErrorCode::E_ROLE_DENIED, "sender is not a member of the target room");
            return None;
        }

        Some((room, sender))
    }

    fn log_fanout(&self, room: &RoomId, sender: &ClientId, event_type: &str, payload: &BTreeMap<String, Value>) {
        self.registry.log_activity(
            room,
            Some(sender.clone()),
            event_type,
            Value::Object(payload.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        );
    }

    /// Common tail for the plain passthrough events (`clipboard_push`,
    /// `file_push`, `file_announcement`, `file_ack`, `file_request_relay`):
    /// resolve the room (falling back to the sender's tracked room, dropping
    /// the event if still unresolved), fan out to the room except the
    /// sender, and log the activity. Unlike `file_available` /
    /// `file_sync_completed` / `file_need_relay`, these do not go through
    /// `authorize` — no `protocol_version` or room-membership gate applies.
    fn plain_fanout(
        &mut self,
        room: Option<RoomId>,
        event_type: &str,
        payload: BTreeMap<String, Value>,
        build: impl FnOnce(RoomId, BTreeMap<String, Value>) -> ServerEvent,
    ) {
        let sender = self.registry.client_of_sid(self.sid);
        let Some(room) = room.or_else(|| sender.as_ref().and_then(|s| self.registry.client_room(s))) else {
            return;
        };

        match &sender {
            Some(sender) => {
                self.log_fanout(&room, sender, event_type, &payload);
                let event = build(room.clone(), payload);
                self.registry.send_to_room_except(&room, sender, event);
            }
            None => {
                self.registry.log_activity(
                    &room,
                    None,
                    event_type,
                    Value::Object(payload.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
                );
                let event = build(room.clone(), payload);
                self.registry.send_to_room(&room, event);
            }
        }
    }
}

impl ClientEventHandler for SignalDispatcher<'_> {
    fn on_join(
        &mut self,
        room: RoomId,
        client_id: String,
        client_type: Option<String>,
        device_name: Option<String>,
        network: Option<NetworkInfo>,
        probe: Option<ProbeInfo>,
    ) {
        if client_type.is_none() {
            self.reply_error(ErrorCode::E_BAD_SCHEMA, "join missing client_type");
            return;
        }
        self.registry.handle_join(self.ctx, self.sid, room, client_id, client_type, device_name, network, probe);
    }

    fn on_leave(&mut self, room: RoomId) {
        self.registry.handle_leave(self.ctx, self.sid, room);
    }

    fn on_peer_network_update(&mut self, room: Option<RoomId>, client_id: Option<String>, network: NetworkInfo) {
        self.registry.handle_network_update(self.ctx, self.sid, room, client_id, network);
    }

    fn on_lan_probe_result(
        &mut self,
        room: RoomId,
        probe_id: Option<String>,
        result: Option<String>,
        latency_ms: Option<u64>,
        reason: Option<String>,
    ) {
        self.registry.handle_probe_result(self.ctx, self.sid, room, probe_id, result, latency_ms, reason);
    }

    fn on_clipboard_push(&mut self, room: RoomId, _protocol_version: Option<String>, payload: BTreeMap<String, Value>) {
        self.plain_fanout(Some(room), "clipboard_push", payload, |room, payload| {
            ServerEvent::ClipboardSync { room, payload }
        });
    }

    fn on_file_push(&mut self, room: RoomId, _protocol_version: Option<String>, payload: BTreeMap<String, Value>) {
        self.plain_fanout(Some(room), "file_push", payload, |room, payload| {
            ServerEvent::FileSync { room, payload }
        });
    }

    fn on_file_announcement(&mut self, room: RoomId, _protocol_version: Option<String>, payload: BTreeMap<String, Value>) {
        self.plain_fanout(Some(room), "file_announcement", payload, |room, payload| {
            ServerEvent::FileAnnouncement { room, payload }
        });
    }

    fn on_file_ack(&mut self, room: RoomId, _protocol_version: Option<String>, payload: BTreeMap<String, Value>) {
        self.plain_fanout(Some(room), "file_ack", payload, |room, payload| {
            ServerEvent::FileAck { room, payload }
        });
    }

    fn on_file_request_relay(&mut self, room: RoomId, _protocol_version: Option<String>, payload: BTreeMap<String, Value>) {
        self.plain_fanout(Some(room), "file_request_relay", payload, |room, payload| {
            ServerEvent::FileRequestRelay { room, payload }
        });
    }

    fn on_file_available(
        &mut self,
        room: RoomId,
        protocol_version: Option<String>,
        file_id: String,
        filename: String,
        transfer_id: Option<String>,
        decision_timeout_ms: Option<u64>,
    ) {
        let Some((room, sender)) = self.authorize(Some(room), protocol_version) else { return };
        self.registry.log_activity(
            &room,
            Some(sender.clone()),
            "file_available",
            serde_json::json!({ "file_id": file_id, "filename": filename }),
        );
        // S6: a PAIR_DIFF_LAN room short-circuits straight to relay
        // fallback without ever fanning this out to the receiver.
        let diff_lan = crate::room_state::derive(self.registry, &room).state == pairsync_proto::RoomStateKind::PairDiffLan;
        if !diff_lan {
            self.registry.send_to_room_except(
                &room,
                &sender,
                ServerEvent::FileAvailable {
                    room: room.clone(),
                    file_id: file_id.clone(),
                    filename: filename.clone(),
                    transfer_id: transfer_id.clone(),
                },
            );
        }
        crate::transfer_machine::handle_file_available(
            self.registry,
            self.ctx,
            &room,
            &sender,
            transfer_id,
            file_id,
            filename,
            decision_timeout_ms,
        );
    }

    fn on_file_sync_completed(
        &mut self,
        room: RoomId,
        protocol_version: Option<String>,
        file_id: String,
        transfer_id: Option<String>,
        method: String,
    ) {
        let Some((room, sender)) = self.authorize(Some(room), protocol_version) else { return };
        self.registry.log_activity(
            &room,
            Some(sender.clone()),
            "file_sync_completed",
            serde_json::json!({ "file_id": file_id, "method": method }),
        );
        self.registry.send_to_room_except(
            &room,
            &sender,
            ServerEvent::FileSyncCompleted {
                room: room.clone(),
                file_id: file_id.clone(),
                transfer_id: transfer_id.clone(),
                method: method.clone(),
            },
        );
        if let Some(transfer_id) = transfer_id {
            crate::transfer_machine::handle_file_sync_completed(self.registry, &transfer_id);
        }
    }

    fn on_file_need_relay(
        &mut self,
        room: RoomId,
        protocol_version: Option<String>,
        file_id: String,
        transfer_id: Option<String>,
        reason: String,
    ) {
        let Some((room, sender)) = self.authorize(Some(room), protocol_version) else { return };
        self.registry.log_activity(
            &room,
            Some(sender.clone()),
            "file_need_relay",
            serde_json::json!({ "file_id": file_id, "reason": reason }),
        );
        self.registry.send_to_room_except(
            &room,
            &sender,
            ServerEvent::FileNeedRelay {
                room: room.clone(),
                file_id: file_id.clone(),
                transfer_id: transfer_id.clone(),
                reason: reason.clone(),
            },
        );
        if let Some(transfer_id) = transfer_id {
            crate::transfer_machine::handle_file_need_relay(self.registry, &transfer_id, &reason);
        }
    }
}
