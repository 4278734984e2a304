//! Pure projection from `(members, last_probe)` to the derived room state,
//! plus the capacity-enforcement eviction policy.

use pairsync_proto::{
    ClientSummary, LanConfidence, ProbeOutcome, RoomId, RoomSnapshot, RoomStateKind,
    ServerEvent, ROOM_MAX_PEERS,
};

use crate::registry::Registry;

/// Derives the observable state of `room` from current Registry state.
/// Never suspends; callers may call this as often as they like.
#[must_use]
pub fn derive(registry: &Registry, room: &RoomId) -> RoomSnapshot {
    let room_rec = registry.rooms.get(room);
    let members = room_rec.map(|r| r.members.as_slice()).unwrap_or(&[]);
    let last_probe = room_rec.and_then(|r| r.last_probe.clone());

    let (state, same_lan, lan_confidence) = match (members.len(), last_probe.as_ref()) {
        (0, _) => (RoomStateKind::Empty, false, LanConfidence::None),
        (1, _) => (RoomStateKind::Single, false, LanConfidence::None),
        (2, Some(p)) if p.status == ProbeOutcome::Ok => {
            (RoomStateKind::PairSameLan, true, LanConfidence::Confirmed)
        }
        (2, Some(p)) if matches!(p.status, ProbeOutcome::Fail | ProbeOutcome::Timeout) => {
            (RoomStateKind::PairDiffLan, false, LanConfidence::Confirmed)
        }
        (2, _) => (RoomStateKind::PairUnknown, false, LanConfidence::None),
        // More than 2 is a transient, pre-eviction state; present it as
        // PAIR_UNKNOWN until `enforce_capacity` brings it back down.
        _ => (RoomStateKind::PairUnknown, false, LanConfidence::None),
    };

    let peers = members
        .iter()
        .filter_map(|cid| registry.clients.get(cid))
        .map(|c| ClientSummary {
            client_id: c.client_id.clone(),
            client_type: c.client_type.as_str().to_owned(),
            device_name: c.device_name.clone(),
            joined_at_ms: c.joined_at_ms,
        })
        .collect();

    RoomSnapshot {
        room: room.clone(),
        max_peers: ROOM_MAX_PEERS,
        state,
        same_lan,
        lan_confidence,
        peers,
        last_probe,
    }
}

/// While `room` has more than [`ROOM_MAX_PEERS`] members, evicts one at a
/// time: the first non-pc member, or else the first (oldest) member.
pub fn enforce_capacity(registry: &mut Registry, room: &RoomId, now_ms: i64) {
    loop {
        let members = match registry.rooms.get(room) {
            Some(r) if r.members.len() > ROOM_MAX_PEERS as usize => r.members.clone(),
            _ => return,
        };

        let evict = members
            .iter()
            .find(|cid| {
                registry
                    .clients
                    .get(*cid)
                    .map_or(true, |c| !c.client_type.is_pc())
            })
            .cloned()
            .unwrap_or_else(|| members[0].clone());

        registry.send_to_client(
            &evict,
            ServerEvent::PeerEvicted {
                room: room.clone(),
                evicted_client_id: evict.clone(),
                reason: "room_capacity_exceeded".to_owned(),
                evicted_at_ms: now_ms,
            },
        );
        registry.close_client_sockets(&evict);
        registry.remove_member(room, &evict);
        registry.purge_client(&evict);
        registry.discard_stale_probe_if_undersized(room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{bare_registry, join};

    #[test]
    fn empty_room_has_no_peers() {
        let registry = bare_registry();
        let snap = derive(&registry, &RoomId("none".into()));
        assert_eq!(snap.state, RoomStateKind::Empty);
    }

    #[test]
    fn single_member_is_single_state() {
        let mut registry = bare_registry();
        join(&mut registry, "R", "A", "pc");
        let snap = derive(&registry, &RoomId("R".into()));
        assert_eq!(snap.state, RoomStateKind::Single);
        assert!(!snap.same_lan);
    }
}
