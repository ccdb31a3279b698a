//! Request handlers shared by the HTTP and WebSocket routes.

mod documents;
mod websocket;

pub use documents::*;
pub use websocket::*;
