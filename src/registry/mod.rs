//! The Registry actor: sole owner of all mutable coordinator state.
//!
//! Modeled as a single-mailbox [`actix::Actor`] rather than a
//! `Mutex`-guarded struct — every message below is handled to completion
//! before the next one starts, which is exactly the single-writer
//! discipline the design calls for, without an explicit lock.

pub mod client;
pub mod pending_probe;
pub mod room;
pub mod transfer;

use std::{collections::HashMap, sync::Arc};

use actix::{Actor, Context, Handler, Message, Recipient};
use pairsync_proto::{ClientId, ClientSummary, NetworkInfo, ProbeInfo, RoomId, ServerEvent};
use serde_json::Value;
use slog::{debug, info, o, Logger};

use crate::{clock::Clock, config::Settings, push::PushNotifier};

use self::{
    client::{Client, ClientType},
    pending_probe::PendingProbe,
    room::Room,
    transfer::TransferContext,
};

/// Reserved room name dashboard/observer clients join to receive
/// `room_state_changed` fan-out and `activity_log` entries for every room.
pub const OBSERVER_ROOM: &str = "__observer__";

/// A connected socket, as tracked by the Registry. `client_id` is `None`
/// until the socket's owning client has `join`ed.
struct SocketHandle {
    recipient: Recipient<Push>,
    client_id: Option<ClientId>,
}

/// Pushes one outbound event down to a specific socket.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Push(pub ServerEvent);

/// Tells a socket's session actor to close the connection after any
/// already-queued [`Push`] messages have been delivered.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Close;

/// Registers a newly-accepted socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub sid: u64,
    pub recipient: Recipient<Push>,
}

/// A socket has gone away (client-initiated close, error, or eviction).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub sid: u64,
}

/// A parsed client event arrived on a socket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Inbound {
    pub sid: u64,
    pub event: pairsync_proto::ClientEvent,
}

/// Server-side fan-out request from the relay HTTP endpoint.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RelayFanout {
    pub room: RoomId,
    pub event: String,
    pub data: Value,
    pub sender_id: Option<ClientId>,
}

/// Read-only snapshot of every room, for the dashboard.
#[derive(Message)]
#[rtype(result = "Vec<pairsync_proto::RoomSnapshot>")]
pub struct Snapshot;

pub struct Registry {
    pub clients: HashMap<ClientId, Client>,
    pub rooms: HashMap<RoomId, Room>,
    pub pending_probes: HashMap<String, PendingProbe>,
    pub transfers: HashMap<String, TransferContext>,
    sockets: HashMap<u64, SocketHandle>,
    pub clock: Arc<Clock>,
    pub config: Arc<Settings>,
    pub push: Arc<dyn PushNotifier>,
    pub log: Logger,
}

impl Registry {
    #[must_use]
    pub fn new(clock: Arc<Clock>, config: Arc<Settings>, push: Arc<dyn PushNotifier>, log: Logger) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            pending_probes: HashMap::new(),
            transfers: HashMap::new(),
            sockets: HashMap::new(),
            clock,
            config,
            push,
            log: log.new(o!("component" => "registry")),
        }
    }

    // -- outbound helpers --------------------------------------------------

    pub fn send_to_sid(&self, sid: u64, event: ServerEvent) {
        if let Some(handle) = self.sockets.get(&sid) {
            handle.recipient.do_send(Push(event));
        }
    }

    pub fn send_to_client(&self, client_id: &ClientId, event: ServerEvent) {
        let Some(client) = self.clients.get(client_id) else { return };
        for sid in &client.sockets {
            self.send_to_sid(*sid, event.clone());
        }
    }

    pub fn close_client_sockets(&self, client_id: &ClientId) {
        let Some(client) = self.clients.get(client_id) else { return };
        for sid in &client.sockets {
            if let Some(handle) = self.sockets.get(sid) {
                handle.recipient.do_send(Close);
            }
        }
    }

    pub fn send_to_room(&self, room: &RoomId, event: ServerEvent) {
        let Some(room_rec) = self.rooms.get(room) else { return };
        for member in &room_rec.members {
            self.send_to_client(member, event.clone());
        }
    }

    pub fn send_to_room_except(&self, room: &RoomId, except: &ClientId, event: ServerEvent) {
        let Some(room_rec) = self.rooms.get(room) else { return };
        for member in &room_rec.members {
            if member != except {
                self.send_to_client(member, event.clone());
            }
        }
    }

    pub fn log_activity(&self, room: &RoomId, sender: Option<ClientId>, log_type: &str, content: Value) {
        self.send_to_room(
            &RoomId(OBSERVER_ROOM.to_owned()),
            ServerEvent::ActivityLog {
                log_type: log_type.to_owned(),
                room: room.clone(),
                sender,
                content,
            },
        );
    }

    /// Recomputes `room`'s derived state and emits `room_state_changed` to
    /// the room itself and to the dashboard observer room, plus an
    /// activity-log entry tagged with `reason`.
    pub fn recompute_and_emit(&mut self, _ctx: &mut Context<Self>, room: &RoomId, reason: &str) {
        let snapshot = crate::room_state::derive(self, room);
        let event = ServerEvent::RoomStateChanged {
            protocol_version: pairsync_proto::PROTOCOL_VERSION,
            room: room.clone(),
            max_peers: snapshot.max_peers,
            state: snapshot.state,
            same_lan: snapshot.same_lan,
            lan_confidence: snapshot.lan_confidence,
            peers: snapshot.peers,
            last_probe: snapshot.last_probe,
        };
        self.send_to_room(room, event.clone());
        self.send_to_room(&RoomId(OBSERVER_ROOM.to_owned()), event);
        self.log_activity(room, None, "room_state_changed", serde_json::json!({ "reason": reason }));
        debug!(self.log, "room state recomputed"; "room" => room.as_str(), "reason" => reason);
    }

    // -- membership mutation -------------------------------------------------

    pub fn remove_member(&mut self, room: &RoomId, client_id: &ClientId) {
        if let Some(room_rec) = self.rooms.get_mut(room) {
            room_rec.members.retain(|m| m != client_id);
            if room_rec.members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    pub fn purge_client(&mut self, client_id: &ClientId) {
        if let Some(client) = self.clients.remove(client_id) {
            for sid in client.sockets {
                self.sockets.remove(&sid);
            }
        }
    }

    pub fn discard_stale_probe_if_undersized(&mut self, room: &RoomId) {
        crate::probe::discard_if_undersized(self, room);
    }

    // -- event handling -------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn handle_join(
        &mut self,
        ctx: &mut Context<Self>,
        sid: u64,
        room: RoomId,
        client_id_raw: String,
        client_type_raw: Option<String>,
        device_name: Option<String>,
        network: Option<NetworkInfo>,
        probe: Option<ProbeInfo>,
    ) {
        let client_id = ClientId(client_id_raw);
        let now = self.clock.now_ms();
        let client_type = ClientType::classify(client_type_raw.as_deref().unwrap_or(""));

        let old_room = self.clients.get(&client_id).and_then(|c| c.room.clone());

        let entry = self.clients.entry(client_id.clone()).or_insert_with(|| Client {
            client_id: client_id.clone(),
            sockets: Default::default(),
            client_type,
            device_name: device_name.clone().unwrap_or_else(|| client_id.as_str().to_owned()),
            room: None,
            joined_at_ms: now,
            last_seen_ms: now,
            network: network.clone().unwrap_or_default(),
            probe: probe.clone().unwrap_or_default(),
        });
        entry.sockets.insert(sid);
        entry.client_type = client_type;
        entry.last_seen_ms = now;
        entry.room = Some(room.clone());
        if let Some(name) = device_name {
            entry.device_name = name;
        }
        if let Some(n) = network {
            entry.network = n;
        }
        if let Some(p) = probe {
            entry.probe = p;
        }

        self.sockets.entry(sid).and_modify(|h| h.client_id = Some(client_id.clone()));

        info!(self.log, "client joined"; "client_id" => client_id.as_str(), "room" => room.as_str());

        if let Some(old) = old_room.filter(|r| *r != room) {
            self.remove_member(&old, &client_id);
            self.discard_stale_probe_if_undersized(&old);
            self.recompute_and_emit(ctx, &old, "peer_left");
            crate::probe::maybe_request_probe(self, ctx, &old);
        }

        let room_rec = self.rooms.entry(room.clone()).or_default();
        if !room_rec.members.contains(&client_id) {
            room_rec.members.push(client_id.clone());
        }

        crate::room_state::enforce_capacity(self, &room, now);
        self.recompute_and_emit(ctx, &room, "peer_joined");
        crate::probe::maybe_request_probe(self, ctx, &room);
    }

    pub fn handle_leave(&mut self, ctx: &mut Context<Self>, sid: u64, room: RoomId) {
        let Some(client_id) = self.sockets.get(&sid).and_then(|h| h.client_id.clone()) else {
            return;
        };
        self.remove_member(&room, &client_id);
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.room = None;
        }
        self.discard_stale_probe_if_undersized(&room);
        self.recompute_and_emit(ctx, &room, "peer_left");
        crate::probe::maybe_request_probe(self, ctx, &room);
    }

    pub fn handle_disconnect(&mut self, ctx: &mut Context<Self>, sid: u64) {
        let Some(handle) = self.sockets.remove(&sid) else { return };
        let Some(client_id) = handle.client_id else { return };
        let Some(client) = self.clients.get_mut(&client_id) else { return };
        client.sockets.remove(&sid);
        if !client.sockets.is_empty() {
            return;
        }
        let room = client.room.clone();
        self.clients.remove(&client_id);
        if let Some(room) = room {
            self.remove_member(&room, &client_id);
            self.discard_stale_probe_if_undersized(&room);
            self.recompute_and_emit(ctx, &room, "peer_left");
            crate::probe::maybe_request_probe(self, ctx, &room);
        }
    }

    pub fn handle_network_update(
        &mut self,
        ctx: &mut Context<Self>,
        sid: u64,
        room: Option<RoomId>,
        client_id_hint: Option<String>,
        network: NetworkInfo,
    ) {
        let Some(sender_client_id) = self.sockets.get(&sid).and_then(|h| h.client_id.clone()) else {
            self.send_to_sid(sid, ServerEvent::Error {
                code: pairsync_proto::ErrorCode::E_ROLE_DENIED,
                msg: "socket has not joined a room".to_owned(),
            });
            return;
        };

        // An explicit `room` that disagrees with the sender's tracked room
        // is rejected outright (E_TRANSFER_STATE is authoritative here, per
        // the design's resolution of this ambiguity).
        if let Some(ref claimed) = room {
            let tracked = self.clients.get(&sender_client_id).and_then(|c| c.room.clone());
            if tracked.as_ref() != Some(claimed) {
                self.send_to_sid(sid, ServerEvent::Error {
                    code: pairsync_proto::ErrorCode::E_TRANSFER_STATE,
                    msg: "room does not match the client's tracked room".to_owned(),
                });
                return;
            }
        }

        let target_client_id = client_id_hint.map(ClientId).unwrap_or(sender_client_id);
        let Some(client) = self.clients.get_mut(&target_client_id) else { return };
        client.network = network;
        client.last_seen_ms = self.clock.now_ms();
        let Some(target_room) = client.room.clone() else { return };

        self.recompute_and_emit(ctx, &target_room, "network_updated");
        crate::probe::maybe_request_probe(self, ctx, &target_room);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_probe_result(
        &mut self,
        ctx: &mut Context<Self>,
        sid: u64,
        room: RoomId,
        probe_id: Option<String>,
        result: Option<String>,
        latency_ms: Option<u64>,
        reason: Option<String>,
    ) {
        crate::probe::handle_result(self, ctx, sid, room, probe_id, result, latency_ms, reason);
    }

    pub fn snapshot(&self) -> Vec<pairsync_proto::RoomSnapshot> {
        self.rooms.keys().map(|r| crate::room_state::derive(self, r)).collect()
    }

    pub fn room_members(&self, room: &RoomId) -> &[ClientId] {
        self.rooms.get(room).map(|r| r.members.as_slice()).unwrap_or(&[])
    }

    pub fn client_of_sid(&self, sid: u64) -> Option<ClientId> {
        self.sockets.get(&sid).and_then(|h| h.client_id.clone())
    }

    pub fn client_room(&self, client_id: &ClientId) -> Option<RoomId> {
        self.clients.get(client_id).and_then(|c| c.room.clone())
    }

    pub fn is_member(&self, room: &RoomId, client_id: &ClientId) -> bool {
        self.rooms.get(room).is_some_and(|r| r.members.contains(client_id))
    }
}

impl Actor for Registry {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(self.log, "registry actor started");
    }
}

impl Handler<Connect> for Registry {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) {
        self.sockets.insert(msg.sid, SocketHandle { recipient: msg.recipient, client_id: None });
    }
}

impl Handler<Disconnect> for Registry {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Self::Context) {
        self.handle_disconnect(ctx, msg.sid);
    }
}

impl Handler<Inbound> for Registry {
    type Result = ();

    fn handle(&mut self, msg: Inbound, ctx: &mut Self::Context) {
        let mut dispatcher = crate::dispatch::SignalDispatcher { registry: self, ctx, sid: msg.sid };
        msg.event.dispatch_with(&mut dispatcher);
    }
}

impl Handler<RelayFanout> for Registry {
    type Result = ();

    fn handle(&mut self, msg: RelayFanout, _ctx: &mut Self::Context) {
        let event = ServerEvent::ActivityLog {
            log_type: format!("relay:{}", msg.event),
            room: msg.room.clone(),
            sender: msg.sender_id.clone(),
            content: msg.data.clone(),
        };
        if let Some(sender_id) = &msg.sender_id {
            self.send_to_room_except(&msg.room, sender_id, wrap_relay_event(&msg.event, &msg.room, msg.data));
        } else {
            self.send_to_room(&msg.room, wrap_relay_event(&msg.event, &msg.room, msg.data));
        }
        self.send_to_room(&RoomId(OBSERVER_ROOM.to_owned()), event);
    }
}

impl Handler<Snapshot> for Registry {
    type Result = Vec<pairsync_proto::RoomSnapshot>;

    fn handle(&mut self, _msg: Snapshot, _ctx: &mut Self::Context) -> Self::Result {
        self.snapshot()
    }
}

/// Builds the outbound event for a server-originated relay fan-out;
/// relay callers name an arbitrary event type, so this is intentionally a
/// generic activity broadcast rather than one of the typed `ServerEvent`
/// variants meant for peer-originated traffic.
fn wrap_relay_event(event_type: &str, room: &RoomId, data: Value) -> ServerEvent {
    ServerEvent::ActivityLog {
        log_type: event_type.to_owned(),
        room: room.clone(),
        sender: None,
        content: data,
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use actix::Context;

    use super::*;
    use crate::{clock::Clock, config::Settings, push::NullPushNotifier};

    /// A Registry with no actor context, for direct unit testing of its
    /// synchronous state-mutation methods. Tests that need scheduling
    /// (`ctx.run_later`) belong in the `tests/` integration suite instead,
    /// where a real actix `System` is available.
    pub fn bare_registry() -> Registry {
        let log = slog::Logger::root(slog::Discard, o!());
        Registry::new(
            Arc::new(Clock::new()),
            Arc::new(Settings::default()),
            Arc::new(NullPushNotifier),
            log,
        )
    }

    /// Joins `client_id` (of `client_type`) into `room` without a real
    /// actix context. Safe for tests that don't exercise probe requests or
    /// fan-out delivery (there are no sockets registered).
    pub fn join(registry: &mut Registry, room: &str, client_id: &str, client_type: &str) {
        // SAFETY-FREE: `Context::new()` builds a context detached from any
        // running actor/arbiter; fine for methods that only touch `self`
        // and never poll the context (none of the call paths below do).
        let mut ctx = Context::new();
        registry.handle_join(
            &mut ctx,
            0,
            RoomId(room.to_owned()),
            client_id.to_owned(),
            Some(client_type.to_owned()),
            None,
            None,
            None,
        );
    }

    #[test]
    fn join_creates_single_member_room() {
        let mut registry = bare_registry();
        join(&mut registry, "R", "A", "pc");
        assert_eq!(registry.room_members(&RoomId("R".into())).len(), 1);
    }

    #[test]
    fn capacity_prefers_non_pc_member_over_oldest() {
        let mut registry = bare_registry();
        join(&mut registry, "R", "pc_A", "pc");
        join(&mut registry, "R", "app_B", "app");
        join(&mut registry, "R", "pc_C", "pc");
        let members = registry.room_members(&RoomId("R".into())).to_vec();
        assert_eq!(members.len(), 2);
        // app_B is evicted even though pc_A is older: the first non-pc
        // member is always preferred over the oldest member.
        assert!(!members.iter().any(|m| m.as_str() == "app_B"));
        assert!(members.iter().any(|m| m.as_str() == "pc_A"));
    }

    #[test]
    fn capacity_evicts_oldest_when_all_same_type() {
        let mut registry = bare_registry();
        join(&mut registry, "R", "pc_A", "pc");
        join(&mut registry, "R", "pc_B", "pc");
        join(&mut registry, "R", "pc_C", "pc");
        let members = registry.room_members(&RoomId("R".into())).to_vec();
        assert_eq!(members.len(), 2);
        assert!(!members.iter().any(|m| m.as_str() == "pc_A"));
    }
}
