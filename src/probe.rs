//! LAN-probe orchestration: deciding when to ask the app peer to probe the
//! pc peer's advertised LAN endpoint, and consuming the result.

use std::net::Ipv4Addr;

use actix::Context;
use pairsync_proto::{ClientId, ErrorCode, LastProbe, ProbeOutcome, RoomId, ServerEvent};
use url::Url;

use crate::registry::{client::Client, Registry};

/// Triggered by peer join/leave, network-metadata updates, and the
/// fallback marking done when a probe URL turns out to be invalid.
pub fn maybe_request_probe(registry: &mut Registry, ctx: &mut Context<Registry>, room: &RoomId) {
    let Some(room_rec) = registry.rooms.get(room) else { return };
    if room_rec.members.len() != 2 {
        return;
    }
    let members = room_rec.members.clone();

    match resolve_pair_and_url(registry, &members) {
        Ok((pc, app, url)) => send_probe_request(registry, ctx, room, &pc, &app, &url),
        Err(()) => mark_invalid_probe_url(registry, ctx, room),
    }
}

fn resolve_pair_and_url(
    registry: &Registry,
    members: &[ClientId],
) -> Result<(ClientId, ClientId, String), ()> {
    if members.len() != 2 {
        return Err(());
    }
    let a = registry.clients.get(&members[0]).ok_or(())?;
    let b = registry.clients.get(&members[1]).ok_or(())?;
    let (pc, app) = if a.client_type.is_pc() && b.client_type.is_app() {
        (a, b)
    } else if b.client_type.is_pc() && a.client_type.is_app() {
        (b, a)
    } else {
        return Err(());
    };
    let url = validate_probe_url(pc)?;
    Ok((pc.client_id.clone(), app.client_id.clone(), url))
}

/// Validates the pc peer's advertised probe URL: `http` scheme, an IPv4
/// host, that host must be an RFC1918/private address, and if the pc's
/// last-known `private_ip` is set it must match the URL's host exactly.
fn validate_probe_url(pc: &Client) -> Result<String, ()> {
    let raw = pc.probe.probe_url.as_ref().ok_or(())?;
    let parsed = Url::parse(raw).map_err(|_| ())?;
    if parsed.scheme() != "http" {
        return Err(());
    }
    let host = parsed.host_str().ok_or(())?;
    let ip: Ipv4Addr = host.parse().map_err(|_| ())?;
    if !ip.is_private() {
        return Err(());
    }
    if let Some(known) = &pc.network.private_ip {
        if known != host {
            return Err(());
        }
    }
    Ok(raw.clone())
}

fn send_probe_request(
    registry: &mut Registry,
    ctx: &mut Context<Registry>,
    room: &RoomId,
    pc: &ClientId,
    app: &ClientId,
    probe_url: &str,
) {
    let probe_id = registry.clock.next_probe_id();
    let now = registry.clock.now_ms();
    let timeout_ms = registry.config.signal.probe_timeout_ms;

    registry.pending_probes.insert(
        probe_id.clone(),
        crate::registry::pending_probe::PendingProbe {
            probe_id: probe_id.clone(),
            room: room.clone(),
            pc_client_id: pc.clone(),
            app_client_id: app.clone(),
            requested_at_ms: now,
            timeout_ms,
            resolved: false,
        },
    );

    registry.send_to_client(
        app,
        ServerEvent::LanProbeRequest {
            room: room.clone(),
            probe_id,
            provider_client_id: pc.clone(),
            probe_url: probe_url.to_owned(),
            timeout_ms,
            requested_at_ms: now,
        },
    );

    let _ = ctx;
}

fn mark_invalid_probe_url(registry: &mut Registry, ctx: &mut Context<Registry>, room: &RoomId) {
    let now = registry.clock.now_ms();
    if let Some(room_rec) = registry.rooms.get_mut(room) {
        room_rec.last_probe = Some(LastProbe {
            probe_id: String::new(),
            status: ProbeOutcome::Fail,
            latency_ms: None,
            checked_at_ms: now,
            reason: Some("invalid_probe_url".to_owned()),
        });
    }
    registry.recompute_and_emit(ctx, room, "probe_url_invalid");
}

/// Handles an inbound `lan_probe_result`. Honors only the first result for
/// a given `probe_id`; everything else (unknown or already-resolved probe)
/// is rejected with `E_PROBE_STALE`.
pub fn handle_result(
    registry: &mut Registry,
    ctx: &mut Context<Registry>,
    sid: u64,
    room: RoomId,
    probe_id: Option<String>,
    result: Option<String>,
    latency_ms: Option<u64>,
    reason: Option<String>,
) {
    let Some(probe_id) = probe_id else {
        registry.send_to_sid(sid, ServerEvent::Error {
            code: ErrorCode::E_BAD_SCHEMA,
            msg: "lan_probe_result missing probe_id".to_owned(),
        });
        return;
    };

    let pending = match registry.pending_probes.get(&probe_id) {
        Some(p) if !p.resolved && p.room == room => p.clone(),
        _ => {
            registry.send_to_sid(sid, ServerEvent::Error {
                code: ErrorCode::E_PROBE_STALE,
                msg: format!("unknown or already-resolved probe {probe_id}"),
            });
            return;
        }
    };

    registry.pending_probes.remove(&probe_id);

    let outcome = ProbeOutcome::coerce(result.as_deref().unwrap_or(""));
    let now = registry.clock.now_ms();
    if let Some(room_rec) = registry.rooms.get_mut(&pending.room) {
        room_rec.last_probe = Some(LastProbe {
            probe_id: probe_id.clone(),
            status: outcome,
            latency_ms,
            checked_at_ms: now,
            reason,
        });
    }
    registry.recompute_and_emit(ctx, &pending.room, "probe_result");
}

/// Drops `room`'s `last_probe` whenever its membership falls below a pair,
/// and garbage-collects any pending probe for it; a stale verdict or a
/// dangling probe from a departed peer must not leak into a new pairing.
pub fn discard_if_undersized(registry: &mut Registry, room: &RoomId) {
    let has_pair = registry.rooms.get(room).map_or(false, |r| r.members.len() >= 2);
    if has_pair {
        return;
    }
    if let Some(room_rec) = registry.rooms.get_mut(room) {
        room_rec.last_probe = None;
    }
    registry.pending_probes.retain(|_, p| &p.room != room);
}
