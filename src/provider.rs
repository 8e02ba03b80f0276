//! Capability traits the coordinator consumes, plus their error types.
//!
//! ARCHITECTURE
//! ============
//! Concrete transports (HTTP identity service, database-backed stores,
//! browser routing, toast UI) live with the collaborators. The coordinator
//! only sees these seams, so tests and local runs can swap in doubles.
//!
//! ERROR HANDLING
//! ==============
//! `Rejected` is a structured failure the collaborator chose to report
//! (bad password, validation); `Transport` is the call itself failing.
//! Both are recoverable: the coordinator notifies and keeps its state.

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;

use tokio::sync::mpsc;

use crate::content::ContentItem;
use crate::identity::{RawIdentity, Session};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors reported by an [`IdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with a structured failure.
    #[error("{message}")]
    Rejected { message: String },

    /// The call did not complete (network, serialization, provider crash).
    #[error("identity provider unavailable: {0}")]
    Transport(String),
}

impl ProviderError {
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    /// Message suitable for showing to the user, if the error carries one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message } | Self::Transport(message) => {
                Some(message.trim()).filter(|m| !m.is_empty())
            }
        }
    }

    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors reported by a [`ContentStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{message}")]
    Rejected { message: String },

    #[error("content store unavailable: {0}")]
    Transport(String),
}

impl StoreError {
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message } | Self::Transport(message) => {
                Some(message.trim()).filter(|m| !m.is_empty())
            }
        }
    }

    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Session change pushed by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established. The payload may lag the provider's
    /// enriched profile, so consumers re-fetch the current identity.
    SignedIn(Session),
    SignedOut,
}

/// Handle that releases a session-change subscription.
pub trait Subscription: Send {
    /// Stop event delivery. Consumes the handle so it runs at most once.
    fn cancel(self: Box<Self>);
}

/// A live subscription: the event stream plus its release handle.
pub struct SessionSubscription {
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub handle: Box<dyn Subscription>,
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Remote identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Canonical current identity, or `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the lookup fails. An error never
    /// carries a usable identity.
    async fn current_identity(&self) -> Result<Option<RawIdentity>, ProviderError>;

    /// # Errors
    ///
    /// `Rejected` for bad credentials, `Transport` if the call fails.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, ProviderError>;

    /// # Errors
    ///
    /// `Rejected` if the account cannot be created, `Transport` if the call fails.
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<Session>, ProviderError>;

    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the session could not be ended.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Start a federated (OAuth) sign-in that redirects away and returns to
    /// `redirect_to`. Completion is reported later as [`SessionEvent::SignedIn`].
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the redirect could not be initiated.
    async fn sign_in_federated(&self, redirect_to: &str) -> Result<(), ProviderError>;

    /// Open a session-change subscription.
    fn subscribe(&self) -> SessionSubscription;
}

/// Read/append access to one content collection.
#[async_trait::async_trait]
pub trait ContentStore<T: ContentItem>: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the collection cannot be read.
    async fn get_all(&self) -> Result<Vec<T>, StoreError>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] if the item was not persisted.
    async fn append(&self, item: T) -> Result<(), StoreError>;
}

/// Kind of user-visible message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Fire-and-forget route change.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Fire-and-forget user-visible message.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}
