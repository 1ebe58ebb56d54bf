//! Content database traits.
//!
//! Every write performed by the sync manager goes through a
//! [`ContentTransaction`] so a failed step can be rolled back as a unit.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::result::AppResult;
use crate::types::content::{NewFeaturedPost, PostRecord, UserRecord};

/// Access to the content database shared by both sites.
///
/// `site_prefix` is a table prefix such as `site1_`.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug + 'static {
    /// Check connectivity (`SELECT 1`).
    async fn ping(&self) -> AppResult<()>;

    /// Published posts and pages modified at or after `since`, most recent first.
    async fn recent_posts(
        &self,
        site_prefix: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<PostRecord>>;

    /// Open a transaction.
    async fn begin(&self) -> AppResult<Box<dyn ContentTransaction>>;

    /// Release the underlying connection. The next call reconnects.
    async fn close(&self);
}

/// A unit of work against the content database.
///
/// Dropping a transaction without committing discards its changes.
#[async_trait]
pub trait ContentTransaction: Send {
    /// Whether a featured copy titled `title` already exists in the site.
    async fn featured_exists(&mut self, site_prefix: &str, title: &str) -> AppResult<bool>;

    /// Insert a published featured copy into the site.
    async fn insert_featured(
        &mut self,
        site_prefix: &str,
        post: &NewFeaturedPost,
    ) -> AppResult<()>;

    /// Replace `placeholder` with `replacement` in every post body that
    /// contains it. Returns the number of rows changed.
    async fn replace_in_content(
        &mut self,
        site_prefix: &str,
        placeholder: &str,
        replacement: &str,
    ) -> AppResult<u64>;

    /// Users registered at or after `since`.
    async fn users_registered_since(
        &mut self,
        site_prefix: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<UserRecord>>;

    /// Whether a user with `email` exists in the site.
    async fn user_exists(&mut self, site_prefix: &str, email: &str) -> AppResult<bool>;

    /// Insert a user into the site.
    async fn insert_user(&mut self, site_prefix: &str, user: &UserRecord) -> AppResult<()>;

    /// Delete revisions last modified before `cutoff`. Returns the count.
    async fn delete_revisions_before(
        &mut self,
        site_prefix: &str,
        cutoff: NaiveDateTime,
    ) -> AppResult<u64>;

    /// Make every change of this transaction durable.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every change of this transaction.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
