//! Session coordinator: owner of the derived user and busy flag, plus the
//! mirrored article and posting collections.
//!
//! DESIGN
//! ======
//! One `Coordinator` is built per application with its collaborators
//! injected, and handed out by cheap clone. State lives in `watch` cells so
//! UI code can read synchronously or subscribe to changes; only the
//! coordinator ever writes them.
//!
//! The session-change stream is opened once by [`Coordinator::start`] and
//! released once, either by [`Coordinator::shutdown`] or when the last
//! handle is dropped. The listener task holds a weak reference so it never
//! keeps the coordinator alive on its own.
//!
//! Startup commits the user as soon as the identity lookup returns, before
//! the content loads. From then on only the listener writes it; both derive
//! from the provider's current identity, so the last write wins.

mod collections;
mod credentials;
mod session;

#[cfg(test)]
pub(crate) mod test_helpers;


use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{error, warn};

use crate::config::SessionConfig;
use crate::content::{Article, Posting};
use crate::identity::DerivedUser;
use crate::provider::{
    ContentStore, IdentityProvider, Navigator, NotificationKind, Notifier, ProviderError, StoreError,
};
use collections::Collection;
use session::ListenerSlot;

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a coordinator operation. Never escapes a public operation:
/// each one logs and notifies instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Local role guard refused the operation before any write.
    #[error("{0}")]
    NotAuthorized(String),
}

impl CoordinatorError {
    /// Best-effort user message, falling back to `fallback`.
    #[must_use]
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        let message = match self {
            Self::Provider(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::NotAuthorized(message) => Some(message.as_str()),
        };
        message.unwrap_or(fallback)
    }

    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_unexpected(),
            Self::Store(e) => e.is_unexpected(),
            Self::NotAuthorized(_) => false,
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Identity state observed by the rest of the application.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<DerivedUser>,
    /// Busy flag, raised during startup, login and signup.
    pub loading: bool,
    /// Set once startup has committed its first identity result.
    pub initialized: bool,
}

/// Committed identity phase, folding in the busy flag before startup settles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Uninitialized,
    Loading,
    Authenticated(DerivedUser),
    Anonymous,
}

impl AuthState {
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        match (&self.user, self.initialized, self.loading) {
            (Some(user), _, _) => AuthPhase::Authenticated(user.clone()),
            (None, false, true) => AuthPhase::Loading,
            (None, false, false) => AuthPhase::Uninitialized,
            (None, true, _) => AuthPhase::Anonymous,
        }
    }
}

/// The capabilities a coordinator is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub articles: Arc<dyn ContentStore<Article>>,
    pub postings: Arc<dyn ContentStore<Posting>>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

// =============================================================================
// COORDINATOR
// =============================================================================

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    identity: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    auth: watch::Sender<AuthState>,
    articles: Collection<Article>,
    postings: Collection<Posting>,
    listener: Mutex<ListenerSlot>,
}

impl Coordinator {
    /// Build an uninitialized coordinator. Call [`Coordinator::start`] next.
    #[must_use]
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        let (auth, _) = watch::channel(AuthState::default());
        let inner = Inner {
            config,
            identity: collaborators.identity,
            navigator: collaborators.navigator,
            notifier: collaborators.notifier,
            auth,
            articles: Collection::new(collaborators.articles),
            postings: Collection::new(collaborators.postings),
            listener: Mutex::new(ListenerSlot::Idle),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Snapshot of the identity state.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.inner.auth.borrow().clone()
    }

    /// Receiver notified on every identity state commit.
    #[must_use]
    pub fn watch_auth(&self) -> watch::Receiver<AuthState> {
        self.inner.auth.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<DerivedUser> {
        self.inner.auth.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.auth.borrow().loading
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.auth.borrow().user.as_ref().is_some_and(DerivedUser::is_admin)
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        self.inner.auth.borrow().phase()
    }

    /// Articles, newest first.
    #[must_use]
    pub fn articles(&self) -> Vec<Article> {
        self.inner.articles.snapshot()
    }

    /// Job postings, newest first.
    #[must_use]
    pub fn postings(&self) -> Vec<Posting> {
        self.inner.postings.snapshot()
    }

    #[must_use]
    pub fn watch_articles(&self) -> watch::Receiver<Vec<Article>> {
        self.inner.articles.watch()
    }

    #[must_use]
    pub fn watch_postings(&self) -> watch::Receiver<Vec<Posting>> {
        self.inner.postings.watch()
    }
}

impl Inner {
    fn commit_user(&self, user: Option<DerivedUser>) {
        self.auth.send_modify(|state| state.user = user);
    }

    fn set_loading(&self, loading: bool) {
        self.auth.send_modify(|state| state.loading = loading);
    }

    /// Log a failed operation and surface it to the user.
    fn report(&self, operation: &'static str, err: &CoordinatorError, fallback: &str) {
        if err.is_unexpected() {
            error!(operation, error = %err, "operation failed unexpectedly");
        } else {
            warn!(operation, error = %err, "operation rejected");
        }
        self.notifier.notify(NotificationKind::Error, err.user_message(fallback));
    }

    fn success(&self, message: &str, route: &str) {
        self.notifier.notify(NotificationKind::Success, message);
        self.navigator.navigate(route);
    }
}
