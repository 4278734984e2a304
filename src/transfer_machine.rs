//! Per-transfer decision state machine: LAN-offer vs. relay-fallback.

use actix::{AsyncContext, Context};
use pairsync_proto::{ClientId, RoomId, RoomStateKind, ServerEvent, TransferAction};

use crate::registry::{
    transfer::{TransferContext, TransferStatus},
    Registry,
};

pub const MIN_DECISION_TIMEOUT_MS: u64 = 1_000;
pub const MAX_DECISION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DECISION_TIMEOUT_MS: u64 = 10_000;

fn clamp_decision_timeout(registry: &Registry, requested: Option<u64>) -> u64 {
    let cfg = &registry.config.transfer;
    let default = cfg.decision_timeout_ms_default;
    let min = cfg.decision_timeout_ms_min;
    let max = cfg.decision_timeout_ms_max;
    requested.unwrap_or(default).clamp(min, max)
}

fn find_transfer_mut<'r>(registry: &'r mut Registry, transfer_id: &str) -> Option<&'r mut TransferContext> {
    registry.transfers.get_mut(transfer_id)
}

/// Handles an inbound `file_available`, creating the transfer context if
/// `transfer_id` is new (or absent) and driving the `created` transition.
#[allow(clippy::too_many_arguments)]
pub fn handle_file_available(
    registry: &mut Registry,
    ctx: &mut Context<Registry>,
    room: &RoomId,
    sender_client_id: &ClientId,
    transfer_id: Option<String>,
    file_id: String,
    filename: String,
    decision_timeout_ms: Option<u64>,
) {
    let transfer_id = transfer_id.unwrap_or_else(|| registry.clock.next_transfer_id());

    // get_or_create is idempotent: any existing context — terminal or
    // not — is returned unchanged. A non-terminal one (waiting_result,
    // created) must not be reset, or its decision-timeout worker would
    // be scheduled a second time for the same transfer_id.
    if registry.transfers.contains_key(&transfer_id) {
        return;
    }

    let now = registry.clock.now_ms();
    let timeout_ms = clamp_decision_timeout(registry, decision_timeout_ms);
    let receiver_client_id = registry
        .room_members(room)
        .iter()
        .find(|m| *m != sender_client_id)
        .cloned();

    let snapshot = crate::room_state::derive(registry, room);
    let diff_lan = snapshot.state == RoomStateKind::PairDiffLan;

    let status = if diff_lan { TransferStatus::FallbackRequested } else { TransferStatus::WaitingResult };

    registry.transfers.insert(
        transfer_id.clone(),
        TransferContext {
            transfer_id: transfer_id.clone(),
            room: room.clone(),
            sender_client_id: sender_client_id.clone(),
            receiver_client_id,
            file_id: file_id.clone(),
            filename,
            status,
            created_at_ms: now,
            updated_at_ms: None,
            decision_timeout_ms: timeout_ms,
            decision_deadline_ms: now + timeout_ms as i64,
            last_reason: None,
        },
    );

    if diff_lan {
        instruct_upload_relay(registry, &transfer_id, "room_diff_lan");
        return;
    }

    schedule_decision_timeout(ctx, transfer_id, timeout_ms);
}

/// Schedules the background check for a transfer's decision deadline.
/// Re-fetches the context by ID when it fires and bails if it is gone or
/// no longer in a decidable status — the context is never held across the
/// suspension point.
fn schedule_decision_timeout(ctx: &mut Context<Registry>, transfer_id: String, timeout_ms: u64) {
    ctx.run_later(std::time::Duration::from_millis(timeout_ms), move |registry, ctx| {
        on_decision_deadline(registry, ctx, &transfer_id);
    });
}

fn on_decision_deadline(registry: &mut Registry, _ctx: &mut Context<Registry>, transfer_id: &str) {
    let Some(transfer) = find_transfer_mut(registry, transfer_id) else { return };
    if !matches!(transfer.status, TransferStatus::WaitingResult | TransferStatus::Offered) {
        return;
    }
    transfer.status = TransferStatus::FallbackTimeout;
    transfer.updated_at_ms = Some(registry.clock.now_ms());
    instruct_upload_relay(registry, transfer_id, "decision_timeout");
}

/// A `file_sync_completed` arrived: the LAN path worked.
pub fn handle_file_sync_completed(registry: &mut Registry, transfer_id: &str) {
    let now = registry.clock.now_ms();
    let Some(transfer) = find_transfer_mut(registry, transfer_id) else { return };
    if transfer.is_terminal() {
        return;
    }
    transfer.status = TransferStatus::LanSuccess;
    transfer.updated_at_ms = Some(now);
    transfer.last_reason = Some("lan_ack".to_owned());

    let sender = transfer.sender_client_id.clone();
    let room = transfer.room.clone();
    let transfer_id = transfer.transfer_id.clone();
    let file_id = transfer.file_id.clone();

    registry.send_to_client(
        &sender,
        ServerEvent::TransferCommand {
            room,
            transfer_id,
            file_id,
            action: TransferAction::Finish,
            reason: "lan_ack".to_owned(),
            issued_at_ms: now,
        },
    );
}

/// A `file_need_relay` arrived: the receiver gave up on the LAN path.
pub fn handle_file_need_relay(registry: &mut Registry, transfer_id: &str, reason: &str) {
    let Some(transfer) = find_transfer_mut(registry, transfer_id) else { return };
    if transfer.is_terminal() {
        return;
    }
    transfer.status = TransferStatus::FallbackRequested;
    transfer.updated_at_ms = Some(registry.clock.now_ms());
    instruct_upload_relay(registry, transfer_id, reason);
}

/// Emits `transfer_command{action:"upload_relay"}` plus the legacy
/// `file_need_relay` echo to every socket of the transfer's sender.
fn instruct_upload_relay(registry: &mut Registry, transfer_id: &str, reason: &str) {
    let Some(transfer) = registry.transfers.get(transfer_id) else { return };
    let sender = transfer.sender_client_id.clone();
    let room = transfer.room.clone();
    let file_id = transfer.file_id.clone();
    let transfer_id = transfer.transfer_id.clone();
    let now = registry.clock.now_ms();

    registry.send_to_client(
        &sender,
        ServerEvent::TransferCommand {
            room: room.clone(),
            transfer_id: transfer_id.clone(),
            file_id: file_id.clone(),
            action: TransferAction::UploadRelay,
            reason: reason.to_owned(),
            issued_at_ms: now,
        },
    );
    registry.send_to_client(
        &sender,
        ServerEvent::FileNeedRelay {
            room,
            file_id,
            transfer_id: Some(transfer_id),
            reason: reason.to_owned(),
        },
    );
}

#[cfg(test)]
mod tests {
    use actix::Context;
    use pairsync_proto::RoomId;

    use super::*;
    use crate::registry::tests::{bare_registry, join};

    #[test]
    fn lan_pair_file_available_waits_for_result() {
        let mut registry = bare_registry();
        join(&mut registry, "R", "pc_A", "pc");
        join(&mut registry, "R", "app_B", "app");
        // Neither peer has a probe result yet (no probe_url was ever
        // configured in `join`'s test helper, so the pair sits at
        // PAIR_UNKNOWN, not PAIR_DIFF_LAN — clear the invalid-probe-url
        // verdict the join path records so this isn't mistaken for one).
        registry.rooms.get_mut(&RoomId("R".into())).unwrap().last_probe = None;
        let mut ctx = Context::new();
        handle_file_available(
            &mut registry,
            &mut ctx,
            &RoomId("R".into()),
            &ClientId("pc_A".into()),
            Some("tr_1".into()),
            "f1".into(),
            "x.bin".into(),
            None,
        );
        let t = registry.transfers.get("tr_1").unwrap();
        assert_eq!(t.status, TransferStatus::WaitingResult);
        assert_eq!(t.receiver_client_id, Some(ClientId("app_B".into())));
    }

    #[test]
    fn completed_transfer_is_terminal_and_ignores_relay_request() {
        let mut registry = bare_registry();
        join(&mut registry, "R", "pc_A", "pc");
        join(&mut registry, "R", "app_B", "app");
        registry.rooms.get_mut(&RoomId("R".into())).unwrap().last_probe = None;
        let mut ctx = Context::new();
        handle_file_available(
            &mut registry,
            &mut ctx,
            &RoomId("R".into()),
            &ClientId("pc_A".into()),
            Some("tr_1".into()),
            "f1".into(),
            "x.bin".into(),
            None,
        );
        handle_file_sync_completed(&mut registry, "tr_1");
        assert_eq!(registry.transfers.get("tr_1").unwrap().status, TransferStatus::LanSuccess);

        handle_file_need_relay(&mut registry, "tr_1", "late_request");
        assert_eq!(registry.transfers.get("tr_1").unwrap().status, TransferStatus::LanSuccess);
    }
}
