//! WebSocket upgrade route.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::handlers::handle_websocket_connection;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws - subscribe to change notifications for the caller's collections.
async fn ws_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    let conn_manager = state.conn_manager.clone();
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, conn_manager, auth.user_id))
}
