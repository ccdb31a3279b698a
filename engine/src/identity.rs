//! Identity state and the provider seam.
//!
//! The engine never handles credentials. It only needs to know who is signed
//! in right now and to be told when that changes.

use crate::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Who the current shopper is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "userId", rename_all = "camelCase")]
pub enum Identity {
    /// No remote identity; carts live on the device
    #[default]
    Anonymous,
    /// Signed in; carts live under this user's remote collection
    Authenticated(UserId),
}

impl Identity {
    pub fn authenticated(user_id: impl Into<UserId>) -> Self {
        Identity::Authenticated(user_id.into())
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user_id) => Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}

/// Classification of a change between two identity values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityTransition {
    /// Anonymous to authenticated (sign-in or sign-up)
    SignedIn(UserId),
    /// Authenticated to anonymous
    SignedOut(UserId),
    /// One user replaced by another without passing through anonymous
    Switched { from: UserId, to: UserId },
    /// Same value on both sides
    Unchanged,
}

impl IdentityTransition {
    pub fn between(previous: &Identity, next: &Identity) -> Self {
        match (previous, next) {
            (Identity::Anonymous, Identity::Authenticated(to)) => Self::SignedIn(to.clone()),
            (Identity::Authenticated(from), Identity::Anonymous) => Self::SignedOut(from.clone()),
            (Identity::Authenticated(from), Identity::Authenticated(to)) if from != to => {
                Self::Switched {
                    from: from.clone(),
                    to: to.clone(),
                }
            }
            _ => Self::Unchanged,
        }
    }

    /// The user whose remote store should receive the local contents, if any.
    pub fn sync_target(&self) -> Option<&str> {
        match self {
            Self::SignedIn(user_id) | Self::Switched { to: user_id, .. } => Some(user_id),
            Self::SignedOut(_) | Self::Unchanged => None,
        }
    }
}

/// Source of the current identity.
///
/// Implementations wrap whatever identity service the application uses.
pub trait IdentityProvider: Send + Sync {
    /// Identity at the moment of the call.
    fn current_identity(&self) -> Identity;

    /// Receiver that observes every later identity change.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Identity>;
}

/// In-process identity holder.
///
/// Applications call [`IdentityContext::sign_in`] and friends after their
/// identity service reports success.
#[derive(Debug)]
pub struct IdentityContext {
    sender: watch::Sender<Identity>,
}

impl IdentityContext {
    /// Create a context that starts anonymous.
    pub fn new() -> Self {
        Self::with_identity(Identity::Anonymous)
    }

    pub fn with_identity(identity: Identity) -> Self {
        let (sender, _) = watch::channel(identity);
        Self { sender }
    }

    pub fn current(&self) -> Identity {
        self.sender.borrow().clone()
    }

    /// Replace the identity and return the previous one.
    pub fn set(&self, identity: Identity) -> Identity {
        let previous = self.sender.send_replace(identity.clone());
        tracing::debug!(?previous, next = ?identity, "Identity changed");
        previous
    }

    /// Record a successful sign-in.
    pub fn sign_in(&self, user_id: impl Into<UserId>) -> Identity {
        self.set(Identity::authenticated(user_id))
    }

    /// Record a successful sign-up. A new account is signed in immediately.
    pub fn sign_up(&self, user_id: impl Into<UserId>) -> Identity {
        self.sign_in(user_id)
    }

    /// Record a sign-out.
    pub fn sign_out(&self) -> Identity {
        self.set(Identity::Anonymous)
    }
}

impl Default for IdentityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for IdentityContext {
    fn current_identity(&self) -> Identity {
        self.current()
    }

    fn subscribe(&self) -> watch::Receiver<Identity> {
        self.sender.subscribe()
    }
}
