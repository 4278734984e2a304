//! `POST /api/relay` — server-side fan-out of an event into a room,
//! skipping the sockets of `sender_id` when given. No authentication by
//! design; callers are internal services, not end-user clients.

use actix::Addr;
use actix_web::{web, HttpResponse};
use pairsync_proto::{ClientId, RoomId};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CoordinatorError;
use crate::registry::{RelayFanout, Registry};

#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    room: Option<String>,
    event: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    sender_id: Option<String>,
}

pub async fn relay(
    registry: web::Data<Addr<Registry>>,
    body: web::Json<RelayRequest>,
) -> Result<HttpResponse, CoordinatorError> {
    let room = body.room.clone().ok_or(CoordinatorError::MissingField("room"))?;
    let event = body.event.clone().ok_or(CoordinatorError::MissingField("event"))?;

    let msg = RelayFanout {
        room: RoomId(room),
        event,
        data: body.data.clone(),
        sender_id: body.sender_id.clone().map(ClientId),
    };

    registry.send(msg).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
