//! Client API protocol for the pairsync signaling coordinator.
//!
//! This crate is shared, in spirit, between the coordinator and any client
//! implementation: it only defines the wire shapes and the newtype IDs, with
//! no coordinator-side state or behavior.

#![forbid(non_ascii_idents, unsafe_code)]

pub mod client_event;
pub mod error;
pub mod ids;
pub mod network;
pub mod room_state;
pub mod server_event;

pub use client_event::{ClientEvent, ClientEventHandler};
pub use error::{ErrorCode, ProtoError};
pub use ids::{ClientId, RoomId, SocketId};
pub use network::{NetworkInfo, ProbeInfo, ProbeOutcome};
pub use room_state::{ClientSummary, LanConfidence, LastProbe, RoomSnapshot, RoomStateKind};
pub use server_event::{ServerEvent, TransferAction};

/// Protocol version the coordinator speaks; see `ClientEvent`'s
/// `protocol_version` fields.
pub const PROTOCOL_VERSION: &str = "4.0";

/// Maximum members a room may hold at once.
pub const ROOM_MAX_PEERS: u8 = 2;
