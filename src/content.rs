//! Content items mirrored from the remote store: blog articles and job postings.
//!
//! Both kinds share a lifecycle (created only by a privileged append, then
//! reloaded in full) and are always exposed newest first.

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::identity::DerivedUser;

/// Which collection an item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Article,
    Posting,
}

impl ContentKind {
    /// Plural noun used in log fields and user-visible messages.
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Article => "articles",
            Self::Posting => "job postings",
        }
    }

    #[must_use]
    pub fn singular(self) -> &'static str {
        match self {
            Self::Article => "Article",
            Self::Posting => "Job posting",
        }
    }
}

/// Common surface of a stored content item.
pub trait ContentItem: Clone + Send + Sync + 'static {
    const KIND: ContentKind;

    fn id(&self) -> &str;
    fn date(&self) -> Date;
}

// =============================================================================
// ARTICLE
// =============================================================================

/// A published blog article.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Author display name at creation time.
    pub author: String,
    pub author_id: String,
    pub date: Date,
}

/// Caller-supplied article fields; the rest are synthesized on append.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Article {
    /// Stamp a draft with server-bound fields. Authorship is a snapshot of
    /// `author` and is never re-derived.
    #[must_use]
    pub fn from_draft(draft: NewArticle, id: String, date: Date, author: &DerivedUser) -> Self {
        Self {
            id,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            category: draft.category,
            image: draft.image,
            author: author.name.clone(),
            author_id: author.id.clone(),
            date,
        }
    }
}

impl ContentItem for Article {
    const KIND: ContentKind = ContentKind::Article;

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> Date {
        self.date
    }
}

// =============================================================================
// POSTING
// =============================================================================

/// An open job posting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: String,
    pub title: String,
    pub department: String,
    pub location: String,
    /// Full-time, contract, etc.
    pub employment_type: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub date: Date,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPosting {
    pub title: String,
    pub department: String,
    pub location: String,
    pub employment_type: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Posting {
    #[must_use]
    pub fn from_draft(draft: NewPosting, id: String, date: Date) -> Self {
        Self {
            id,
            title: draft.title,
            department: draft.department,
            location: draft.location,
            employment_type: draft.employment_type,
            description: draft.description,
            requirements: draft.requirements,
            date,
        }
    }
}

impl ContentItem for Posting {
    const KIND: ContentKind = ContentKind::Posting;

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> Date {
        self.date
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Sort most recent first. Stable, so same-day items keep store order.
pub fn sort_newest_first<T: ContentItem>(items: &mut [T]) {
    items.sort_by(|a, b| b.date().cmp(&a.date()));
}

/// Identifier derived from the current wall-clock time in milliseconds.
#[must_use]
pub fn timestamp_id() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    millis.to_string()
}

/// Today's calendar date (UTC).
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}
