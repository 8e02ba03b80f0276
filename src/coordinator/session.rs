//! Startup, session-change events, and teardown.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Coordinator, Inner};
use crate::identity::derive_user;
use crate::provider::{SessionEvent, Subscription};

/// Lifecycle of the session-change subscription.
pub(super) enum ListenerSlot {
    Idle,
    Running(Listener),
    Closed,
}

/// Listener task plus its subscription. Dropping it releases both.
pub(super) struct Listener {
    task: JoinHandle<()>,
    subscription: Option<Box<dyn Subscription>>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            debug!("session subscription released");
        }
    }
}

impl Coordinator {
    /// Subscribe to session changes, resolve the current identity, then load
    /// both collections. Provider failures are logged and never fatal.
    ///
    /// Subsequent calls are ignored.
    pub async fn start(&self) {
        {
            let mut slot = self.inner.listener.lock().await;
            if !matches!(*slot, ListenerSlot::Idle) {
                warn!("coordinator already started; ignoring");
                return;
            }
            let subscription = self.inner.identity.subscribe();
            let task = spawn_listener(Arc::downgrade(&self.inner), subscription.events);
            *slot = ListenerSlot::Running(Listener { task, subscription: Some(subscription.handle) });
        }

        self.inner.set_loading(true);
        let user = match self.inner.identity.current_identity().await {
            Ok(identity) => identity.map(|raw| derive_user(&raw, &self.inner.config.admin_domain)),
            Err(e) => {
                warn!(error = %e, "current session lookup failed; continuing signed out");
                None
            }
        };

        info!(
            user_id = user.as_ref().map(|u| u.id.as_str()),
            role = user.as_ref().map(|u| u.role.as_str()),
            "session resolved"
        );
        // Must land before the content loads; session events may arrive
        // during them.
        self.inner.auth.send_modify(|state| {
            state.user = user;
            state.initialized = true;
        });

        self.refresh_articles().await;
        self.refresh_postings().await;

        self.inner.set_loading(false);
        info!("session coordinator started");
    }

    /// Release the session subscription. Only the first call has an effect;
    /// a coordinator that was never started simply becomes closed.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.inner.listener.lock().await, ListenerSlot::Closed);
        if let ListenerSlot::Running(listener) = previous {
            drop(listener);
            info!("session coordinator shut down");
        }
    }

    /// Apply one session-change event.
    ///
    /// A sign-in never trusts the event payload: the current identity is
    /// fetched again so the user reflects the provider's enriched profile.
    pub(crate) async fn handle_session_event(&self, event: SessionEvent) {
        self.inner.handle_session_event(event).await;
    }
}

impl Inner {
    async fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedIn(session) => {
                debug!(user_id = %session.identity.id, "signed-in event received");
                match self.identity.current_identity().await {
                    Ok(Some(raw)) => {
                        let user = derive_user(&raw, &self.config.admin_domain);
                        info!(user_id = %user.id, role = user.role.as_str(), "user signed in");
                        self.commit_user(Some(user));
                    }
                    Ok(None) => debug!("signed-in event without a current identity; ignoring"),
                    Err(e) => warn!(error = %e, "current identity lookup failed after sign-in"),
                }
            }
            SessionEvent::SignedOut => {
                info!("user signed out");
                self.commit_user(None);
            }
        }
    }
}

fn spawn_listener(inner: Weak<Inner>, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.handle_session_event(event).await;
        }
        debug!("session event stream closed");
    })
}
