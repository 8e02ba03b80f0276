//! Content refresh and role-gated append.
//!
//! TRADE-OFFS
//! ==========
//! An append is followed by a full reload instead of an optimistic local
//! insert, so whatever the store normalizes (ids, validation) is what the
//! UI shows. The local list is only ever replaced wholesale by a successful
//! reload; a failed read keeps the previous list.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::{Coordinator, CoordinatorError, Inner};
use crate::content::{Article, ContentItem, NewArticle, NewPosting, Posting, sort_newest_first, timestamp_id, today};
use crate::identity::DerivedUser;
use crate::provider::ContentStore;

/// One mirrored collection and the store behind it.
pub(super) struct Collection<T: ContentItem> {
    store: Arc<dyn ContentStore<T>>,
    items: watch::Sender<Vec<T>>,
}

impl<T: ContentItem> Collection<T> {
    pub(super) fn new(store: Arc<dyn ContentStore<T>>) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self { store, items }
    }

    pub(super) fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub(super) fn watch(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    async fn reload(&self) -> Result<usize, CoordinatorError> {
        let mut fetched = self.store.get_all().await?;
        sort_newest_first(&mut fetched);
        let count = fetched.len();
        self.items.send_replace(fetched);
        Ok(count)
    }
}

impl Coordinator {
    /// Reload all articles from the store.
    pub async fn refresh_articles(&self) {
        self.inner.refresh(&self.inner.articles).await;
    }

    /// Reload all job postings from the store.
    pub async fn refresh_postings(&self) {
        self.inner.refresh(&self.inner.postings).await;
    }

    /// Publish an article as the current admin user.
    pub async fn add_article(&self, draft: NewArticle) {
        let inner = &self.inner;
        let route = inner.config.routes.articles.clone();
        inner
            .add(&inner.articles, &route, |author| Article::from_draft(draft, timestamp_id(), today(), author))
            .await;
    }

    /// Publish a job posting as the current admin user.
    pub async fn add_posting(&self, draft: NewPosting) {
        let inner = &self.inner;
        let route = inner.config.routes.postings.clone();
        inner
            .add(&inner.postings, &route, |_| Posting::from_draft(draft, timestamp_id(), today()))
            .await;
    }
}

impl Inner {
    async fn refresh<T: ContentItem>(&self, collection: &Collection<T>) {
        let kind = T::KIND;
        match collection.reload().await {
            Ok(count) => debug!(collection = kind.plural(), count, "collection refreshed"),
            Err(e) => self.report("refresh", &e, &format!("Failed to load {}", kind.plural())),
        }
    }

    async fn add<T, F>(&self, collection: &Collection<T>, route: &str, build: F)
    where
        T: ContentItem,
        F: FnOnce(&DerivedUser) -> T,
    {
        let kind = T::KIND;
        match self.try_add(collection, build).await {
            Ok(id) => {
                info!(collection = kind.plural(), %id, "content item published");
                self.success(&format!("{} published successfully", kind.singular()), route);
            }
            Err(e) => self.report("append", &e, &format!("Failed to publish {}", kind.singular().to_lowercase())),
        }
    }

    async fn try_add<T, F>(&self, collection: &Collection<T>, build: F) -> Result<String, CoordinatorError>
    where
        T: ContentItem,
        F: FnOnce(&DerivedUser) -> T,
    {
        let user = self.auth.borrow().user.clone();
        let Some(user) = user.filter(DerivedUser::is_admin) else {
            return Err(CoordinatorError::NotAuthorized(format!("Only admins can add {}", T::KIND.plural())));
        };

        let item = build(&user);
        let id = item.id().to_owned();
        collection.store.append(item).await?;
        self.refresh(collection).await;
        Ok(id)
    }
}
