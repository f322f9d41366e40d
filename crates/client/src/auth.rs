//! Authentication context
//!
//! Holds the signed-in user for the clients that need it. Observers take an
//! [`AuthSubscription`] and unsubscribe by dropping it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// The signed-in user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    /// Bearer token sent with every API request
    pub token: String,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>, email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            token: token.into(),
        }
    }
}

/// Shared handle to the current authentication state
#[derive(Debug, Clone)]
pub struct AuthContext {
    tx: Arc<watch::Sender<Option<AuthUser>>>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    /// Create a signed-out context
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a context that is already signed in
    pub fn signed_in(user: AuthUser) -> Self {
        let context = Self::new();
        context.sign_in(user);
        context
    }

    pub fn sign_in(&self, user: AuthUser) {
        info!(uid = %user.uid, "User signed in");
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("User signed out");
        }
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|user| user.token.clone())
    }

    /// Start observing sign-in/sign-out; drop the subscription to stop
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live observation of an [`AuthContext`]
#[derive(Debug)]
pub struct AuthSubscription {
    rx: watch::Receiver<Option<AuthUser>>,
}

impl AuthSubscription {
    pub fn current(&self) -> Option<AuthUser> {
        self.rx.borrow().clone()
    }

    /// Wait for the next sign-in or sign-out.
    ///
    /// Returns `None` once the context itself is gone.
    pub async fn changed(&mut self) -> Option<Option<AuthUser>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stop observing
    pub fn unsubscribe(self) {}
}
