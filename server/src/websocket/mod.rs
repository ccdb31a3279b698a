//! WebSocket change notifications.
//!
//! Clients connect with their bearer token and are told whenever one of
//! their collections is written, so a second device can refresh without
//! polling.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
