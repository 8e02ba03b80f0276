//! In-process collaborators for local runs and integration tests.
//!
//! `MemoryIdentityProvider` keeps accounts and the current session in memory
//! and pushes session events to live subscribers. Profiles are stored apart
//! from sessions, so `current_identity` can return a richer record than the
//! session an event carried, like a real provider whose profile rows are
//! written after sign-up.

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::content::ContentItem;
use crate::identity::{Metadata, Profile, RawIdentity, Session};
use crate::provider::{
    ContentStore, IdentityProvider, Navigator, NotificationKind, Notifier, ProviderError, SessionEvent,
    SessionSubscription, StoreError, Subscription,
};

const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// IDENTITY
// =============================================================================

struct Account {
    password: String,
    identity: RawIdentity,
}

#[derive(Default)]
struct IdentityState {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    /// Keyed by user id.
    profiles: HashMap<String, Profile>,
    current: Option<Session>,
    subscribers: Vec<(u64, mpsc::UnboundedSender<SessionEvent>)>,
    next_subscriber: u64,
    federated_requests: Vec<String>,
}

impl IdentityState {
    fn broadcast(&mut self, event: &SessionEvent) {
        self.subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn open_session(&mut self, identity: RawIdentity) -> Session {
        let session = Session { access_token: Uuid::new_v4().simple().to_string(), identity };
        self.current = Some(session.clone());
        self.broadcast(&SessionEvent::SignedIn(session.clone()));
        session
    }

    fn enriched(&self, identity: &RawIdentity) -> RawIdentity {
        let mut identity = identity.clone();
        if let Some(profile) = self.profiles.get(&identity.id) {
            identity.profile = Some(profile.clone());
        }
        identity
    }
}

/// Identity provider backed by in-memory accounts.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    state: Arc<Mutex<IdentityState>>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account without signing it in. Returns the user id.
    pub fn seed_account(&self, email: &str, password: &str, name: Option<&str>) -> String {
        let identity = RawIdentity {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_owned()),
            metadata: name.map(|n| Metadata { name: Some(n.to_owned()), avatar_url: None }),
            profile: None,
        };
        let id = identity.id.clone();
        self.state()
            .accounts
            .insert(email.to_ascii_lowercase(), Account { password: password.to_owned(), identity });
        id
    }

    /// Store or replace the profile row for `user_id`.
    pub fn set_profile(&self, user_id: &str, profile: Profile) {
        self.state().profiles.insert(user_id.to_owned(), profile);
    }

    /// Store a profile row as it comes off the wire. Unknown columns are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Rejects the row when a known column has the wrong shape, leaving any
    /// stored profile in place.
    pub fn set_profile_row(&self, user_id: &str, row: serde_json::Value) -> Result<(), ProviderError> {
        let profile = Profile::from_value(row).map_err(|e| {
            warn!(user_id, error = %e, "malformed profile row");
            ProviderError::rejected(format!("Invalid profile: {e}"))
        })?;
        self.set_profile(user_id, profile);
        Ok(())
    }

    /// Finish a pending federated sign-in as `identity`, as the provider
    /// does when the browser returns from the redirect.
    pub fn complete_federated(&self, identity: RawIdentity) -> Session {
        self.state().open_session(identity)
    }

    /// Redirect targets requested through `sign_in_federated`, oldest first.
    #[must_use]
    pub fn federated_requests(&self) -> Vec<String> {
        self.state().federated_requests.clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.state().current.clone()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_identity(&self) -> Result<Option<RawIdentity>, ProviderError> {
        let state = self.state();
        Ok(state.current.as_ref().map(|s| state.enriched(&s.identity)))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, ProviderError> {
        let mut state = self.state();
        let identity = match state.accounts.get(&email.to_ascii_lowercase()) {
            Some(account) if account.password == password => account.identity.clone(),
            _ => return Err(ProviderError::rejected("Invalid login credentials")),
        };
        Ok(Some(state.open_session(identity)))
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Option<Session>, ProviderError> {
        if !email.contains('@') {
            return Err(ProviderError::rejected("Unable to validate email address: invalid format"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let key = email.to_ascii_lowercase();
        let mut state = self.state();
        if state.accounts.contains_key(&key) {
            return Err(ProviderError::rejected("User already registered"));
        }
        let name = Some(name.trim().to_owned()).filter(|n| !n.is_empty());
        let identity = RawIdentity {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_owned()),
            metadata: Some(Metadata { name, avatar_url: None }),
            profile: None,
        };
        state
            .accounts
            .insert(key, Account { password: password.to_owned(), identity: identity.clone() });
        info!(user_id = %identity.id, "account created");
        Ok(Some(state.open_session(identity)))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.current = None;
        state.broadcast(&SessionEvent::SignedOut);
        Ok(())
    }

    async fn sign_in_federated(&self, redirect_to: &str) -> Result<(), ProviderError> {
        self.state().federated_requests.push(redirect_to.to_owned());
        Ok(())
    }

    fn subscribe(&self) -> SessionSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.push((id, tx));
        let handle = MemorySubscription { state: Arc::downgrade(&self.state), id };
        SessionSubscription { events: rx, handle: Box::new(handle) }
    }
}

struct MemorySubscription {
    state: Weak<Mutex<IdentityState>>,
    id: u64,
}

impl Subscription for MemorySubscription {
    fn cancel(self: Box<Self>) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

// =============================================================================
// CONTENT
// =============================================================================

/// Content store holding items in insertion order.
pub struct MemoryContentStore<T> {
    items: RwLock<Vec<T>>,
}

impl<T> Default for MemoryContentStore<T> {
    fn default() -> Self {
        Self { items: RwLock::new(Vec::new()) }
    }
}

impl<T: ContentItem> MemoryContentStore<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self { items: RwLock::new(items) }
    }
}

#[async_trait::async_trait]
impl<T: ContentItem> ContentStore<T> for MemoryContentStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.items.read().await.clone())
    }

    async fn append(&self, item: T) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(StoreError::rejected(format!("duplicate id {}", item.id())));
        }
        items.push(item);
        Ok(())
    }
}

// =============================================================================
// EFFECTS
// =============================================================================

/// Navigator that logs each route change and remembers the last one.
#[derive(Default)]
pub struct TracingNavigator {
    current: Mutex<Option<String>>,
}

impl TracingNavigator {
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        info!(%path, "navigate");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.to_owned());
    }
}

/// Notifier that writes messages to the log.
#[derive(Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success => info!(%message, "notify success"),
            NotificationKind::Error => warn!(%message, "notify error"),
        }
    }
}
