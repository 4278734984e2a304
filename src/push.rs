//! Best-effort mobile push notification dispatch.
//!
//! Push delivery is advisory: a paired app may be backgrounded with its
//! socket closed, so the coordinator fires a push alongside (never instead
//! of) the websocket fan-out. Failures are logged and otherwise swallowed —
//! nothing about the signaling state machine depends on push succeeding.

use pairsync_proto::{ClientId, RoomId};
use slog::{warn, Logger};

/// A push-notification backend. The default build ships [`NullPushNotifier`];
/// a real deployment injects one backed by FCM/APNs at startup.
pub trait PushNotifier: Send + Sync {
    fn notify(&self, room: &RoomId, client_id: &ClientId, event_type: &str);
}

/// Logs the notification and otherwise does nothing. Useful for local
/// development and for deployments with no push provider configured.
pub struct NullPushNotifier;

impl PushNotifier for NullPushNotifier {
    fn notify(&self, _room: &RoomId, _client_id: &ClientId, _event_type: &str) {}
}

/// Wraps any [`PushNotifier`] so its failures never propagate; `notify`
/// itself can't fail by signature, but a backend spawning async work (e.g.
/// an HTTP call to a push gateway) should catch its own errors and log
/// through `log` rather than this wrapper — kept here as the documented
/// seam for that pattern.
pub struct LoggingPushNotifier<T> {
    inner: T,
    log: Logger,
}

impl<T: PushNotifier> LoggingPushNotifier<T> {
    pub fn new(inner: T, log: Logger) -> Self {
        Self { inner, log }
    }
}

impl<T: PushNotifier> PushNotifier for LoggingPushNotifier<T> {
    fn notify(&self, room: &RoomId, client_id: &ClientId, event_type: &str) {
        warn!(self.log, "push dispatch is best-effort and unconfigured";
            "room" => room.as_str(), "client_id" => client_id.as_str(), "event" => event_type);
        self.inner.notify(room, client_id, event_type);
    }
}
