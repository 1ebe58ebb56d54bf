//! In-memory content store.
//!
//! A transaction works on a private copy of the tables; commit swaps the
//! copy in, rollback or drop throws it away. Faults can be injected to
//! exercise rollback and degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use contentops_core::error::AppError;
use contentops_core::result::AppResult;
use contentops_core::traits::content::{ContentStore, ContentTransaction};
use contentops_core::types::content::{
    FEATURED_POST_TYPE, NewFeaturedPost, PostRecord, UserRecord,
};

use crate::schema::validate_site_prefix;

#[derive(Debug, Default, Clone)]
struct SiteTables {
    posts: Vec<PostRecord>,
    users: Vec<UserRecord>,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    sites: HashMap<String, SiteTables>,
    next_id: u64,
}

impl Tables {
    fn site(&self, prefix: &str) -> AppResult<Option<&SiteTables>> {
        validate_site_prefix(prefix)?;
        Ok(self.sites.get(prefix))
    }

    fn site_mut(&mut self, prefix: &str) -> AppResult<&mut SiteTables> {
        validate_site_prefix(prefix)?;
        Ok(self.sites.entry(prefix.to_string()).or_default())
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug)]
struct Faults {
    unreachable: AtomicBool,
    /// Writes still allowed before every further write fails.
    write_budget: AtomicUsize,
}

impl Faults {
    fn check_reachable(&self) -> AppResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::database("Database unreachable"));
        }
        Ok(())
    }

    fn consume_write(&self) -> AppResult<()> {
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| AppError::database("Injected write failure"))
    }
}

/// Content store holding both sites' tables in memory.
#[derive(Debug, Clone)]
pub struct InMemoryContentStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    closes: Arc<AtomicUsize>,
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            faults: Arc::new(Faults {
                unreachable: AtomicBool::new(false),
                write_budget: AtomicUsize::new(usize::MAX),
            }),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl InMemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a post. The post's `id` is kept and the ID counter moves past it.
    pub fn add_post(&self, site_prefix: &str, post: PostRecord) -> AppResult<()> {
        let mut tables = self.lock();
        tables.next_id = tables.next_id.max(post.id);
        tables.site_mut(site_prefix)?.posts.push(post);
        Ok(())
    }

    /// Seed a user.
    pub fn add_user(&self, site_prefix: &str, user: UserRecord) -> AppResult<()> {
        self.lock().site_mut(site_prefix)?.users.push(user);
        Ok(())
    }

    /// Committed posts of a site.
    pub fn posts(&self, site_prefix: &str) -> Vec<PostRecord> {
        self.lock()
            .sites
            .get(site_prefix)
            .map(|site| site.posts.clone())
            .unwrap_or_default()
    }

    /// Committed users of a site.
    pub fn users(&self, site_prefix: &str) -> Vec<UserRecord> {
        self.lock()
            .sites
            .get(site_prefix)
            .map(|site| site.users.clone())
            .unwrap_or_default()
    }

    /// Make every call fail as if the server were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.faults.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Allow `n` more writes, then fail every write after that.
    pub fn fail_writes_after(&self, n: usize) {
        self.faults.write_budget.store(n, Ordering::SeqCst);
    }

    /// Remove any write failure injected by [`Self::fail_writes_after`].
    pub fn clear_write_faults(&self) {
        self.faults.write_budget.store(usize::MAX, Ordering::SeqCst);
    }

    /// How many times [`ContentStore::close`] was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn ping(&self) -> AppResult<()> {
        self.faults.check_reachable()
    }

    async fn recent_posts(
        &self,
        site_prefix: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<PostRecord>> {
        self.faults.check_reachable()?;
        let tables = self.lock();
        let mut posts: Vec<PostRecord> = tables
            .site(site_prefix)?
            .map(|site| {
                site.posts
                    .iter()
                    .filter(|p| {
                        p.modified >= since
                            && p.status == "publish"
                            && (p.post_type == "post" || p.post_type == "page")
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        posts.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(posts)
    }

    async fn begin(&self) -> AppResult<Box<dyn ContentTransaction>> {
        self.faults.check_reachable()?;
        let staged = self.lock().clone();
        Ok(Box::new(InMemoryTransaction {
            tables: self.tables.clone(),
            faults: self.faults.clone(),
            staged,
        }))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct InMemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    staged: Tables,
}

#[async_trait]
impl ContentTransaction for InMemoryTransaction {
    async fn featured_exists(&mut self, site_prefix: &str, title: &str) -> AppResult<bool> {
        Ok(self.staged.site(site_prefix)?.is_some_and(|site| {
            site.posts
                .iter()
                .any(|p| p.title == title && p.post_type == FEATURED_POST_TYPE)
        }))
    }

    async fn insert_featured(
        &mut self,
        site_prefix: &str,
        post: &NewFeaturedPost,
    ) -> AppResult<()> {
        self.faults.consume_write()?;
        let id = self.staged.allocate_id();
        self.staged.site_mut(site_prefix)?.posts.push(PostRecord {
            id,
            title: post.title.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            status: "publish".to_string(),
            modified: Utc::now().naive_utc(),
            post_type: FEATURED_POST_TYPE.to_string(),
            guid: post.guid.clone(),
        });
        Ok(())
    }

    async fn replace_in_content(
        &mut self,
        site_prefix: &str,
        placeholder: &str,
        replacement: &str,
    ) -> AppResult<u64> {
        self.faults.consume_write()?;
        let mut changed = 0;
        for post in &mut self.staged.site_mut(site_prefix)?.posts {
            if post.content.contains(placeholder) {
                post.content = post.content.replace(placeholder, replacement);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn users_registered_since(
        &mut self,
        site_prefix: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<UserRecord>> {
        Ok(self
            .staged
            .site(site_prefix)?
            .map(|site| {
                site.users
                    .iter()
                    .filter(|u| u.registered >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn user_exists(&mut self, site_prefix: &str, email: &str) -> AppResult<bool> {
        Ok(self
            .staged
            .site(site_prefix)?
            .is_some_and(|site| site.users.iter().any(|u| u.email == email)))
    }

    async fn insert_user(&mut self, site_prefix: &str, user: &UserRecord) -> AppResult<()> {
        self.faults.consume_write()?;
        self.staged.site_mut(site_prefix)?.users.push(user.clone());
        Ok(())
    }

    async fn delete_revisions_before(
        &mut self,
        site_prefix: &str,
        cutoff: NaiveDateTime,
    ) -> AppResult<u64> {
        self.faults.consume_write()?;
        let site = self.staged.site_mut(site_prefix)?;
        let before = site.posts.len();
        site.posts
            .retain(|p| !(p.post_type == "revision" && p.modified < cutoff));
        Ok((before - site.posts.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.faults.check_reachable()?;
        let Self { tables, staged, .. } = *self;
        *tables.lock().unwrap_or_else(PoisonError::into_inner) = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use contentops_core::ErrorKind;

    fn post(id: u64, title: &str, post_type: &str, age_hours: i64) -> PostRecord {
        PostRecord {
            id,
            title: title.to_string(),
            content: format!("{title} body"),
            excerpt: String::new(),
            status: "publish".to_string(),
            modified: Utc::now().naive_utc() - Duration::hours(age_hours),
            post_type: post_type.to_string(),
            guid: format!("guid-{id}"),
        }
    }

    #[tokio::test]
    async fn test_recent_posts_filters_and_orders() {
        let store = InMemoryContentStore::new();
        store.add_post("site1_", post(1, "older", "post", 5)).unwrap();
        store.add_post("site1_", post(2, "newer", "page", 1)).unwrap();
        store.add_post("site1_", post(3, "stale", "post", 48)).unwrap();
        store.add_post("site1_", post(4, "rev", "revision", 1)).unwrap();

        let since = Utc::now().naive_utc() - Duration::hours(24);
        let recent = store.recent_posts("site1_", since).await.unwrap();
        let titles: Vec<_> = recent.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = InMemoryContentStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(
            "site2_",
            &UserRecord {
                login: "ann".to_string(),
                email: "ann@example.com".to_string(),
                registered: Utc::now().naive_utc(),
                display_name: "Ann".to_string(),
            },
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();
        assert!(store.users("site2_").is_empty());
    }

    #[tokio::test]
    async fn test_write_budget() {
        let store = InMemoryContentStore::new();
        store.fail_writes_after(1);
        let mut tx = store.begin().await.unwrap();
        let since = Utc::now().naive_utc();
        assert!(tx.delete_revisions_before("site1_", since).await.is_ok());
        let err = tx.delete_revisions_before("site1_", since).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let store = InMemoryContentStore::new();
        store.set_unreachable(true);
        assert!(store.ping().await.is_err());
        assert!(store.begin().await.is_err());
    }
}
