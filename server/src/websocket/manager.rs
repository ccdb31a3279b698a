//! WebSocket connection manager.
//!
//! Tracks active connections per user and fans change notifications out to
//! them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tote_engine::UserId;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    pub user_id: UserId,
    pub sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Connection IDs per user.
    by_user: DashMap<UserId, Vec<String>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection and return its ID.
    pub fn register(&self, user_id: UserId, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.connections.insert(
            conn_id.clone(),
            Connection {
                user_id: user_id.clone(),
                sender,
            },
        );
        self.by_user
            .entry(user_id.clone())
            .or_default()
            .push(conn_id.clone());

        tracing::info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection registered");

        conn_id
    }

    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            if let Some(mut conn_ids) = self.by_user.get_mut(&conn.user_id) {
                conn_ids.retain(|id| id != conn_id);
                if conn_ids.is_empty() {
                    drop(conn_ids);
                    self.by_user.remove(&conn.user_id);
                }
            }

            tracing::info!(conn_id = %conn_id, user_id = %conn.user_id, "WebSocket connection unregistered");
        }
    }

    /// Send a message to every connection of `user_id`.
    ///
    /// Returns the number of connections that received the message.
    pub fn notify_user(&self, user_id: &str, message: ServerMessage) -> usize {
        let conn_ids = match self.by_user.get(user_id) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        let sent_count = conn_ids
            .iter()
            .filter(|id| self.send_to(id, message.clone()))
            .count();

        tracing::debug!(user_id = %user_id, recipients = sent_count, "Notified user connections");

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of distinct users with at least one connection.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let manager = ConnectionManager::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let first = manager.register("alice".to_string(), tx1);
        let second = manager.register("alice".to_string(), tx2);
        assert_eq!(manager.connection_count(), 2);
        assert_eq!(manager.user_count(), 1);

        manager.unregister(&first);
        assert_eq!(manager.user_count(), 1);
        manager.unregister(&second);
        assert_eq!(manager.connection_count(), 0);
        assert_eq!(manager.user_count(), 0);
    }

    #[test]
    fn test_notify_user_reaches_only_that_user() {
        let manager = ConnectionManager::new();

        let (alice_phone, mut rx1) = mpsc::unbounded_channel();
        let (alice_laptop, mut rx2) = mpsc::unbounded_channel();
        let (bob, mut rx3) = mpsc::unbounded_channel();

        manager.register("alice".to_string(), alice_phone);
        manager.register("alice".to_string(), alice_laptop);
        manager.register("bob".to_string(), bob);

        let sent = manager.notify_user("alice", ServerMessage::Pong);
        assert_eq!(sent, 2);

        assert_eq!(rx1.try_recv().unwrap(), ServerMessage::Pong);
        assert_eq!(rx2.try_recv().unwrap(), ServerMessage::Pong);
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn test_notify_unknown_user() {
        let manager = ConnectionManager::new();
        assert_eq!(manager.notify_user("nobody", ServerMessage::Pong), 0);
    }

    #[test]
    fn test_closed_receiver_is_not_counted() {
        let manager = ConnectionManager::new();
        let (tx, rx) = mpsc::unbounded_channel();
        manager.register("alice".to_string(), tx);
        drop(rx);

        assert_eq!(manager.notify_user("alice", ServerMessage::Pong), 0);
    }
}
