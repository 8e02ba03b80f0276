//! Collaborator doubles for coordinator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{Notify, mpsc, watch};

use super::{AuthState, Collaborators, Coordinator};
use crate::config::SessionConfig;
use crate::content::{Article, ContentItem, Posting};
use crate::identity::{DerivedUser, Metadata, RawIdentity, Role, Session};
use crate::provider::{
    ContentStore, IdentityProvider, Navigator, NotificationKind, Notifier, ProviderError, SessionEvent,
    SessionSubscription, StoreError, Subscription,
};
use time::macros::date;

// =========================================================================
// ScriptedIdentity
// =========================================================================

/// Identity provider whose answers are set by the test.
pub struct ScriptedIdentity {
    pub current: Mutex<Result<Option<RawIdentity>, ProviderError>>,
    pub sign_in_result: Mutex<Option<Result<Option<Session>, ProviderError>>>,
    pub sign_up_result: Mutex<Option<Result<Option<Session>, ProviderError>>>,
    pub sign_out_result: Mutex<Option<Result<(), ProviderError>>>,
    pub federated_result: Mutex<Option<Result<(), ProviderError>>>,
    pub federated_redirects: Mutex<Vec<String>>,
    pub current_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub cancel_calls: Arc<AtomicUsize>,
    pub events: Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
    /// Runs inside `sign_in`, while the operation is in flight.
    pub during_sign_in: OnceLock<Box<dyn Fn() + Send + Sync>>,
}

impl ScriptedIdentity {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Ok(None)),
            sign_in_result: Mutex::new(None),
            sign_up_result: Mutex::new(None),
            sign_out_result: Mutex::new(None),
            federated_result: Mutex::new(None),
            federated_redirects: Mutex::new(Vec::new()),
            current_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            cancel_calls: Arc::new(AtomicUsize::new(0)),
            events: Mutex::new(None),
            during_sign_in: OnceLock::new(),
        }
    }

    pub fn with_current(identity: Option<RawIdentity>) -> Self {
        let provider = Self::new();
        *provider.current.lock().unwrap() = Ok(identity);
        provider
    }

    pub fn set_current(&self, result: Result<Option<RawIdentity>, ProviderError>) {
        *self.current.lock().unwrap() = result;
    }

    /// Push an event to the coordinator's subscription.
    pub fn emit(&self, event: SessionEvent) {
        let events = self.events.lock().unwrap();
        events.as_ref().expect("not subscribed").send(event).unwrap();
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_identity(&self) -> Result<Option<RawIdentity>, ProviderError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Option<Session>, ProviderError> {
        if let Some(hook) = self.during_sign_in.get() {
            hook();
        }
        self.sign_in_result.lock().unwrap().clone().unwrap_or(Ok(None))
    }

    async fn sign_up(&self, _email: &str, _password: &str, _name: &str) -> Result<Option<Session>, ProviderError> {
        self.sign_up_result.lock().unwrap().clone().unwrap_or(Ok(None))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }

    async fn sign_in_federated(&self, redirect_to: &str) -> Result<(), ProviderError> {
        self.federated_redirects.lock().unwrap().push(redirect_to.to_owned());
        self.federated_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }

    fn subscribe(&self) -> SessionSubscription {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        SessionSubscription { events: rx, handle: Box::new(CountingSubscription(self.cancel_calls.clone())) }
    }
}

struct CountingSubscription(Arc<AtomicUsize>);

impl Subscription for CountingSubscription {
    fn cancel(self: Box<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// =========================================================================
// FlakyStore
// =========================================================================

/// Content store that counts calls and fails on demand.
pub struct FlakyStore<T> {
    pub items: Mutex<Vec<T>>,
    pub fail_get_all: Mutex<Option<StoreError>>,
    pub fail_append: Mutex<Option<StoreError>>,
    pub get_all_calls: AtomicUsize,
    pub append_calls: AtomicUsize,
    /// When set, `get_all` parks until the test releases it.
    pub gate: OnceLock<Arc<Gate>>,
}

/// Rendezvous for holding a store call in flight.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl<T: ContentItem> FlakyStore<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
            fail_get_all: Mutex::new(None),
            fail_append: Mutex::new(None),
            get_all_calls: AtomicUsize::new(0),
            append_calls: AtomicUsize::new(0),
            gate: OnceLock::new(),
        }
    }

    /// Arm the gate; each later `get_all` blocks until `release` is notified.
    pub fn gate(&self) -> Arc<Gate> {
        self.gate.get_or_init(|| Arc::new(Gate::default())).clone()
    }

    pub fn get_all_calls(&self) -> usize {
        self.get_all_calls.load(Ordering::SeqCst)
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<T: ContentItem> ContentStore<T> for FlakyStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gate.get() {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(err) = self.fail_get_all.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.items.lock().unwrap().clone())
    }

    async fn append(&self, item: T) -> Result<(), StoreError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_append.lock().unwrap().clone() {
            return Err(err);
        }
        self.items.lock().unwrap().push(item);
        Ok(())
    }
}

// =========================================================================
// Effects
// =========================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Notify(NotificationKind, String),
    /// Route plus the user the coordinator held when navigation fired.
    Navigate(String, Option<DerivedUser>),
}

/// Records notifications and navigations in one ordered log.
#[derive(Default)]
pub struct RecordingEffects {
    pub log: Mutex<Vec<Effect>>,
    pub auth: OnceLock<watch::Receiver<AuthState>>,
}

impl RecordingEffects {
    pub fn take(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    pub fn errors(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Effect::Notify(NotificationKind::Error, m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn routes(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Effect::Navigate(path, _) => Some(path.clone()),
                Effect::Notify(..) => None,
            })
            .collect()
    }
}

impl Navigator for RecordingEffects {
    fn navigate(&self, path: &str) {
        let user = self.auth.get().and_then(|rx| rx.borrow().user.clone());
        self.log.lock().unwrap().push(Effect::Navigate(path.to_owned(), user));
    }
}

impl Notifier for RecordingEffects {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.log.lock().unwrap().push(Effect::Notify(kind, message.to_owned()));
    }
}

// =========================================================================
// Fixtures
// =========================================================================

pub struct Harness {
    pub coordinator: Coordinator,
    pub identity: Arc<ScriptedIdentity>,
    pub articles: Arc<FlakyStore<Article>>,
    pub postings: Arc<FlakyStore<Posting>>,
    pub effects: Arc<RecordingEffects>,
}

impl Harness {
    /// Build a coordinator over the given doubles without starting it.
    pub fn new(identity: ScriptedIdentity, articles: Vec<Article>, postings: Vec<Posting>) -> Self {
        let identity = Arc::new(identity);
        let articles = Arc::new(FlakyStore::new(articles));
        let postings = Arc::new(FlakyStore::new(postings));
        let effects = Arc::new(RecordingEffects::default());
        let coordinator = Coordinator::new(
            SessionConfig::default(),
            Collaborators {
                identity: identity.clone(),
                articles: articles.clone(),
                postings: postings.clone(),
                navigator: effects.clone(),
                notifier: effects.clone(),
            },
        );
        let _ = effects.auth.set(coordinator.watch_auth());
        Self { coordinator, identity, articles, postings, effects }
    }

    /// Build and start with `identity` as the current session.
    pub async fn started(identity: Option<RawIdentity>) -> Self {
        let harness = Self::new(ScriptedIdentity::with_current(identity), Vec::new(), Vec::new());
        harness.coordinator.start().await;
        harness.effects.take();
        harness
    }
}

pub fn admin_identity() -> RawIdentity {
    RawIdentity { id: "u1".into(), email: Some("a@synjoint.com".into()), metadata: None, profile: None }
}

pub fn visitor_identity() -> RawIdentity {
    RawIdentity {
        id: "u2".into(),
        email: Some("b@example.com".into()),
        metadata: Some(Metadata { name: Some("Bea".into()), avatar_url: None }),
        profile: None,
    }
}

pub fn session_for(identity: RawIdentity) -> Session {
    Session { access_token: "token".into(), identity }
}

pub fn article(id: &str, date: time::Date) -> Article {
    Article {
        id: id.into(),
        title: format!("Article {id}"),
        excerpt: String::new(),
        content: String::new(),
        category: "News".into(),
        image: None,
        author: "Ada".into(),
        author_id: "u1".into(),
        date,
    }
}

pub fn posting(id: &str, date: time::Date) -> Posting {
    Posting {
        id: id.into(),
        title: format!("Role {id}"),
        department: "Engineering".into(),
        location: "Remote".into(),
        employment_type: "Full-time".into(),
        description: String::new(),
        requirements: Vec::new(),
        date,
    }
}

pub fn seeded_articles() -> Vec<Article> {
    vec![
        article("a-old", date!(2023 - 02 - 01)),
        article("a-new", date!(2024 - 09 - 12)),
        article("a-mid", date!(2024 - 01 - 15)),
    ]
}

pub fn assert_role(user: &DerivedUser, role: Role) {
    assert_eq!(user.role, role, "unexpected role for {}", user.id);
}

/// Wait until the coordinator's identity state satisfies `predicate`.
pub async fn wait_for_auth<F>(coordinator: &Coordinator, predicate: F) -> AuthState
where
    F: FnMut(&AuthState) -> bool,
{
    let mut rx = coordinator.watch_auth();
    let state = tokio::time::timeout(std::time::Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for auth state")
        .expect("coordinator dropped");
    state.clone()
}

/// Yield until `condition` holds, for effects not visible through `watch`.
pub async fn settle<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}
