//! The pairsync signaling and relay coordinator.
//!
//! Wires together the [`registry`] actor, the websocket and HTTP surfaces,
//! and the object-store backends. See `main.rs` for process startup.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod logging;
pub mod object_store;
pub mod probe;
pub mod push;
pub mod registry;
pub mod room_state;
pub mod session;
pub mod transfer_machine;
