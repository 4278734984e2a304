//! Integration tests exercising the Registry actor end-to-end, against a
//! recording fake socket actor in place of a real websocket.

use std::sync::{Arc, Mutex};

use actix::{Actor, Addr, Context, Handler, Recipient};
use pairsync_coordinator::{
    clock::Clock,
    config::Settings,
    push::NullPushNotifier,
    registry::{Close, Connect, Inbound, Registry},
};
use pairsync_proto::{ClientEvent, RoomStateKind, ServerEvent};

struct RecordingSocket {
    events: Arc<Mutex<Vec<ServerEvent>>>,
}

impl Actor for RecordingSocket {
    type Context = Context<Self>;
}

impl Handler<pairsync_coordinator::registry::Push> for RecordingSocket {
    type Result = ();

    fn handle(&mut self, msg: pairsync_coordinator::registry::Push, _ctx: &mut Self::Context) {
        self.events.lock().unwrap().push(msg.0);
    }
}

impl Handler<Close> for RecordingSocket {
    type Result = ();

    fn handle(&mut self, _msg: Close, ctx: &mut Self::Context) {
        actix::ActorContext::stop(ctx);
    }
}

fn fake_socket() -> (Recipient<pairsync_coordinator::registry::Push>, Arc<Mutex<Vec<ServerEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let addr = RecordingSocket { events: events.clone() }.start();
    (addr.recipient(), events)
}

async fn start_registry() -> Addr<Registry> {
    let registry = Registry::new(
        Arc::new(Clock::new()),
        Arc::new(Settings::default()),
        Arc::new(NullPushNotifier),
        slog::Logger::root(slog::Discard, slog::o!()),
    );
    registry.start()
}

async fn connect(registry: &Addr<Registry>, sid: u64) -> Arc<Mutex<Vec<ServerEvent>>> {
    let (recipient, events) = fake_socket();
    registry.send(Connect { sid, recipient }).await.unwrap();
    events
}

async fn send_event(registry: &Addr<Registry>, sid: u64, raw: &[u8]) {
    let event = ClientEvent::parse(raw).unwrap();
    registry.send(Inbound { sid, event }).await.unwrap();
}

fn room_state_changed_payloads(events: &Arc<Mutex<Vec<ServerEvent>>>) -> Vec<ServerEvent> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoomStateChanged { .. }))
        .cloned()
        .collect()
}

#[actix::test]
async fn s1_lone_joiner_is_single_state() {
    let registry = start_registry().await;
    let a = connect(&registry, 1).await;

    send_event(&registry, 1, br#"{"type":"join","room":"R","client_id":"A","client_type":"pc"}"#).await;

    let states = room_state_changed_payloads(&a);
    let last = states.last().expect("room_state_changed was emitted");
    match last {
        ServerEvent::RoomStateChanged { state, same_lan, .. } => {
            assert_eq!(*state, RoomStateKind::Single);
            assert!(!same_lan);
        }
        _ => unreachable!(),
    }
}

#[actix::test]
async fn s2_pair_on_same_lan_confirms_via_probe() {
    let registry = start_registry().await;
    let a = connect(&registry, 1).await;
    let b = connect(&registry, 2).await;

    send_event(
        &registry,
        1,
        br#"{"type":"join","room":"R","client_id":"A","client_type":"pc",
             "probe":{"probe_url":"http://192.168.1.10:7777/"}}"#,
    )
    .await;
    send_event(&registry, 2, br#"{"type":"join","room":"R","client_id":"B","client_type":"app"}"#).await;

    let probe_request = b
        .lock()
        .unwrap()
        .iter()
        .find_map(|e| match e {
            ServerEvent::LanProbeRequest { probe_id, timeout_ms, .. } => Some((probe_id.clone(), *timeout_ms)),
            _ => None,
        })
        .expect("app peer received a lan_probe_request");
    assert_eq!(probe_request.1, 1200);
    assert!(a.lock().unwrap().iter().all(|e| !matches!(e, ServerEvent::LanProbeRequest { .. })));

    let probe_id = probe_request.0;
    send_event(
        &registry,
        2,
        format!(r#"{{"type":"lan_probe_result","room":"R","probe_id":"{probe_id}","result":"ok","latency_ms":42}}"#)
            .as_bytes(),
    )
    .await;

    let states = room_state_changed_payloads(&a);
    let last = states.last().unwrap();
    match last {
        ServerEvent::RoomStateChanged { state, same_lan, lan_confidence, .. } => {
            assert_eq!(*state, RoomStateKind::PairSameLan);
            assert!(*same_lan);
            assert_eq!(*lan_confidence, pairsync_proto::LanConfidence::Confirmed);
        }
        _ => unreachable!(),
    }
}

#[actix::test]
async fn s3_public_probe_url_is_rejected() {
    let registry = start_registry().await;
    let a = connect(&registry, 1).await;
    let b = connect(&registry, 2).await;

    send_event(
        &registry,
        1,
        br#"{"type":"join","room":"R","client_id":"A","client_type":"pc",
             "probe":{"probe_url":"http://8.8.8.8/"}}"#,
    )
    .await;
    send_event(&registry, 2, br#"{"type":"join","room":"R","client_id":"B","client_type":"app"}"#).await;

    assert!(b.lock().unwrap().iter().all(|e| !matches!(e, ServerEvent::LanProbeRequest { .. })));

    let states = room_state_changed_payloads(&a);
    let last = states.last().unwrap();
    match last {
        ServerEvent::RoomStateChanged { state, last_probe, .. } => {
            assert_eq!(*state, RoomStateKind::PairDiffLan);
            let probe = last_probe.as_ref().unwrap();
            assert_eq!(probe.reason.as_deref(), Some("invalid_probe_url"));
        }
        _ => unreachable!(),
    }
}

#[actix::test]
async fn s4_lan_offer_succeeds() {
    let registry = start_registry().await;
    let a = connect(&registry, 1).await;
    let b = connect(&registry, 2).await;

    send_event(
        &registry,
        1,
        br#"{"type":"join","room":"R","client_id":"A","client_type":"pc",
             "probe":{"probe_url":"http://192.168.1.10:7777/"}}"#,
    )
    .await;
    send_event(&registry, 2, br#"{"type":"join","room":"R","client_id":"B","client_type":"app"}"#).await;

    let probe_id = b
        .lock()
        .unwrap()
        .iter()
        .find_map(|e| match e {
            ServerEvent::LanProbeRequest { probe_id, .. } => Some(probe_id.clone()),
            _ => None,
        })
        .unwrap();
    send_event(
        &registry,
        2,
        format!(r#"{{"type":"lan_probe_result","room":"R","probe_id":"{probe_id}","result":"ok"}}"#).as_bytes(),
    )
    .await;

    send_event(
        &registry,
        1,
        br#"{"type":"file_available","room":"R","transfer_id":"tr_1","file_id":"f1","filename":"x.bin"}"#,
    )
    .await;
    send_event(
        &registry,
        2,
        br#"{"type":"file_sync_completed","room":"R","file_id":"f1","transfer_id":"tr_1","method":"lan"}"#,
    )
    .await;

    let finish = a.lock().unwrap().iter().find_map(|e| match e {
        ServerEvent::TransferCommand { action, reason, transfer_id, .. } => {
            Some((action.clone(), reason.clone(), transfer_id.clone()))
        }
        _ => None,
    });
    let (action, reason, transfer_id) = finish.expect("sender received a transfer_command");
    assert_eq!(action, pairsync_proto::TransferAction::Finish);
    assert_eq!(reason, "lan_ack");
    assert_eq!(transfer_id, "tr_1");
}

#[actix::test]
async fn s6_diff_lan_short_circuits_to_relay_without_fan_out() {
    let registry = start_registry().await;
    let a = connect(&registry, 1).await;
    let b = connect(&registry, 2).await;

    send_event(
        &registry,
        1,
        br#"{"type":"join","room":"R","client_id":"A","client_type":"pc",
             "probe":{"probe_url":"http://8.8.8.8/"}}"#,
    )
    .await;
    send_event(&registry, 2, br#"{"type":"join","room":"R","client_id":"B","client_type":"app"}"#).await;

    b.lock().unwrap().clear();
    send_event(
        &registry,
        1,
        br#"{"type":"file_available","room":"R","transfer_id":"tr_1","file_id":"f1","filename":"x.bin"}"#,
    )
    .await;

    assert!(b.lock().unwrap().iter().all(|e| !matches!(e, ServerEvent::FileAvailable { .. })));
    let relay = a.lock().unwrap().iter().find_map(|e| match e {
        ServerEvent::TransferCommand { action, reason, .. } => Some((action.clone(), reason.clone())),
        _ => None,
    });
    let (action, reason) = relay.expect("sender was instructed to upload_relay");
    assert_eq!(action, pairsync_proto::TransferAction::UploadRelay);
    assert_eq!(reason, "room_diff_lan");
}

#[actix::test]
async fn s7_capacity_enforcement_evicts_first_non_pc_member() {
    let registry = start_registry().await;
    let _a = connect(&registry, 1).await;
    let b = connect(&registry, 2).await;
    let _c = connect(&registry, 3).await;

    send_event(&registry, 1, br#"{"type":"join","room":"R","client_id":"pc_A","client_type":"pc"}"#).await;
    send_event(&registry, 2, br#"{"type":"join","room":"R","client_id":"app_B","client_type":"app"}"#).await;
    send_event(&registry, 3, br#"{"type":"join","room":"R","client_id":"pc_C","client_type":"pc"}"#).await;

    // Eviction prefers the first member whose type is not "pc" over the
    // oldest member — app_B, not pc_A, even though pc_A joined first.
    let evicted = b.lock().unwrap().iter().find_map(|e| match e {
        ServerEvent::PeerEvicted { evicted_client_id, reason, .. } => {
            Some((evicted_client_id.as_str().to_owned(), reason.clone()))
        }
        _ => None,
    });
    let (evicted_client_id, reason) = evicted.expect("app_B was evicted");
    assert_eq!(evicted_client_id, "app_B");
    assert_eq!(reason, "room_capacity_exceeded");
}
