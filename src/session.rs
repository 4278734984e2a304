//! The websocket session actor: one per accepted connection, bridging
//! actix-web-actors' streaming protocol to the Registry's message API.

use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Recipient, StreamHandler};
use actix_web_actors::ws;
use pairsync_proto::ClientEvent;
use slog::{debug, warn, Logger};

use crate::registry::{Connect, Disconnect, Inbound, Push};
use crate::registry::Registry as RegistryActor;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

pub struct WsSession {
    sid: u64,
    registry: actix::Addr<RegistryActor>,
    last_heartbeat: Instant,
    log: Logger,
    debug_enabled: bool,
    debug_max_chars: usize,
}

impl WsSession {
    #[must_use]
    pub fn new(sid: u64, registry: actix::Addr<RegistryActor>, log: Logger, signal: &crate::config::SignalSettings) -> Self {
        Self {
            sid,
            registry,
            last_heartbeat: Instant::now(),
            log,
            debug_enabled: signal.debug_enabled,
            debug_max_chars: signal.debug_max_chars,
        }
    }

    fn log_raw_frame(&self, raw: &str) {
        if !self.debug_enabled {
            return;
        }
        let truncated: String = raw.chars().take(self.debug_max_chars).collect();
        debug!(self.log, "raw inbound frame"; "sid" => self.sid, "payload" => truncated);
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |session, ctx| {
            if Instant::now().duration_since(session.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(session.log, "client heartbeat timed out, closing"; "sid" => session.sid);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
        let recipient: Recipient<Push> = ctx.address().recipient();
        self.registry.do_send(Connect { sid: self.sid, recipient });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> actix::Running {
        self.registry.do_send(Disconnect { sid: self.sid });
        actix::Running::Stop
    }
}

impl Handler<Push> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Push, ctx: &mut Self::Context) {
        ctx.text(msg.0.to_json());
    }
}

impl Handler<crate::registry::Close> for WsSession {
    type Result = ();

    fn handle(&mut self, _msg: crate::registry::Close, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match item {
            Ok(m) => m,
            Err(e) => {
                warn!(self.log, "websocket protocol error"; "error" => %e);
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(bytes) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&bytes);
            }
            ws::Message::Pong(_) => {
                self.last_heartbeat = Instant::now();
            }
            ws::Message::Text(text) => {
                self.log_raw_frame(&text);
                match ClientEvent::parse(text.as_bytes()) {
                    Ok(event) => self.registry.do_send(Inbound { sid: self.sid, event }),
                    Err(e) => debug!(self.log, "dropping unparseable frame"; "error" => %e),
                }
            }
            ws::Message::Binary(bytes) => {
                self.log_raw_frame(&String::from_utf8_lossy(&bytes));
                match ClientEvent::parse(&bytes) {
                    Ok(event) => self.registry.do_send(Inbound { sid: self.sid, event }),
                    Err(e) => debug!(self.log, "dropping unparseable frame"; "error" => %e),
                }
            }
            ws::Message::Close(reason) => {
                debug!(self.log, "client closed"; "reason" => ?reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}
