//! Post and user records read from and written to a site's tables.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Post type given to cross-site promoted copies.
pub const FEATURED_POST_TYPE: &str = "featured_content";

/// Title prefix given to cross-site promoted copies.
pub const FEATURED_TITLE_PREFIX: &str = "[Featured] ";

/// A published post or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Row ID in the source site's posts table.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Excerpt.
    pub excerpt: String,
    /// Publication status (`publish`, `draft`, ...).
    pub status: String,
    /// Last modification time.
    pub modified: NaiveDateTime,
    /// Post type (`post`, `page`, `revision`, ...).
    pub post_type: String,
    /// Globally unique identifier.
    pub guid: String,
}

/// A featured copy of a post, ready for insertion into another site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeaturedPost {
    /// Title including the featured prefix.
    pub title: String,
    /// Body copied from the source post.
    pub content: String,
    /// Excerpt copied from the source post.
    pub excerpt: String,
    /// `featured-<source_id>-<target_site>`.
    pub guid: String,
}

impl NewFeaturedPost {
    /// Derive the featured copy of `post` destined for `target_site`.
    pub fn from_source(post: &PostRecord, target_site: &str) -> Self {
        Self {
            title: featured_title(&post.title),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            guid: format!("featured-{}-{}", post.id, target_site),
        }
    }
}

/// Title under which a featured copy of `title` is stored.
pub fn featured_title(title: &str) -> String {
    format!("{FEATURED_TITLE_PREFIX}{title}")
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Login name.
    pub login: String,
    /// Email address. Deduplication key across sites.
    pub email: String,
    /// Registration time.
    pub registered: NaiveDateTime,
    /// Display name.
    pub display_name: String,
}
