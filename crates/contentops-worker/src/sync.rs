//! Sync manager: cross-site featured content, links, users, and revision
//! cleanup.
//!
//! Every write step runs in one transaction. A failing step is rolled back
//! and reported as a sync error; `run_full_sync` still attempts the others.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use contentops_core::config::{SitesConfig, SyncConfig};
use contentops_core::error::{AppError, ErrorKind};
use contentops_core::result::AppResult;
use contentops_core::traits::content::{ContentStore, ContentTransaction};
use contentops_core::types::content::{NewFeaturedPost, PostRecord};

/// Placeholder in site1 content replaced by the URL of site2.
pub const CROSS_LINK_SITE2: &str = "CROSS_LINK_SITE2";

/// Placeholder in site2 content replaced by the URL of site1.
pub const CROSS_LINK_SITE1: &str = "CROSS_LINK_SITE1";

/// Table prefix of a site name, e.g. `site1` -> `site1_`.
pub fn table_prefix(site: &str) -> String {
    format!("{site}_")
}

/// Site name of a table prefix, e.g. `site1_` -> `site1`.
pub fn site_name(prefix: &str) -> &str {
    prefix.trim_end_matches('_')
}

/// Per-step counts of a full synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Featured copies inserted into site2.
    pub featured_to_site2: u64,
    /// Featured copies inserted into site1.
    pub featured_to_site1: u64,
    /// Posts whose cross-site placeholders were replaced.
    pub links_updated: u64,
    /// Users copied to site2.
    pub users_to_site2: u64,
    /// Users copied to site1.
    pub users_to_site1: u64,
    /// Revisions deleted across both sites.
    pub revisions_deleted: u64,
    /// Steps that failed and were rolled back.
    pub failed_steps: Vec<String>,
}

impl SyncSummary {
    /// Whether every step succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_steps.is_empty()
    }

    fn record(&mut self, step: &str, result: AppResult<u64>) -> u64 {
        match result {
            Ok(count) => count,
            Err(e) => {
                error!(step, error = %e, "Sync step failed");
                self.failed_steps.push(step.to_string());
                0
            }
        }
    }
}

/// Runs synchronization between the two sites.
#[derive(Debug, Clone)]
pub struct SyncManager {
    store: Arc<dyn ContentStore>,
    sites: SitesConfig,
    config: SyncConfig,
}

impl SyncManager {
    /// Create a manager over `store`.
    pub fn new(store: Arc<dyn ContentStore>, sites: SitesConfig, config: SyncConfig) -> Self {
        Self {
            store,
            sites,
            config,
        }
    }

    /// Published posts and pages modified in the last `hours`, newest first.
    ///
    /// Returns an empty list when the query fails.
    pub async fn get_recent_posts(&self, site_prefix: &str, hours: u32) -> Vec<PostRecord> {
        let since = cutoff(Duration::hours(i64::from(hours)));
        match self.store.recent_posts(site_prefix, since).await {
            Ok(posts) => {
                info!(site_prefix, count = posts.len(), "Fetched recent posts");
                posts
            }
            Err(e) => {
                error!(site_prefix, error = %e, "Failed to fetch recent posts");
                Vec::new()
            }
        }
    }

    /// Copy recent posts of `source_site` into `target_site` as featured
    /// content, skipping copies that already exist. Returns the number
    /// inserted.
    pub async fn sync_featured_content(
        &self,
        source_site: &str,
        target_site: &str,
    ) -> AppResult<u64> {
        let step = "featured content sync";
        let posts = self
            .get_recent_posts(&table_prefix(source_site), self.config.recent_hours)
            .await;
        if posts.is_empty() {
            info!(source = source_site, "No recent posts to feature");
            return Ok(0);
        }

        let target_prefix = table_prefix(target_site);
        let mut tx = self.begin(step).await?;
        let result = copy_featured(tx.as_mut(), &posts, &target_prefix, target_site).await;
        let inserted = finish(tx, step, result).await?;

        info!(
            source = source_site,
            target = target_site,
            inserted,
            "Synced featured content"
        );
        Ok(inserted)
    }

    /// Replace cross-site placeholders with absolute site URLs. Returns the
    /// number of posts changed in both sites.
    pub async fn update_cross_site_links(
        &self,
        site1_prefix: &str,
        site2_prefix: &str,
    ) -> AppResult<u64> {
        let step = "cross-site link update";
        let mut tx = self.begin(step).await?;
        let result = async {
            let to_site2 = tx
                .replace_in_content(site1_prefix, CROSS_LINK_SITE2, &self.sites.site2_url())
                .await?;
            let to_site1 = tx
                .replace_in_content(site2_prefix, CROSS_LINK_SITE1, &self.sites.site1_url())
                .await?;
            Ok::<u64, AppError>(to_site2 + to_site1)
        }
        .await;
        let updated = finish(tx, step, result).await?;

        info!(updated, "Updated cross-site links");
        Ok(updated)
    }

    /// Copy users registered in `source_site` during the recent window to
    /// `target_site`, skipping emails already present. Returns the number
    /// copied.
    pub async fn sync_user_data(&self, source_site: &str, target_site: &str) -> AppResult<u64> {
        let step = "user sync";
        let source_prefix = table_prefix(source_site);
        let target_prefix = table_prefix(target_site);
        let since = cutoff(Duration::hours(i64::from(self.config.recent_hours)));

        let mut tx = self.begin(step).await?;
        let result = async {
            let users = tx.users_registered_since(&source_prefix, since).await?;
            let mut copied = 0;
            for user in &users {
                if tx.user_exists(&target_prefix, &user.email).await? {
                    continue;
                }
                tx.insert_user(&target_prefix, user).await?;
                debug!(email = %user.email, "Synced user");
                copied += 1;
            }
            Ok::<u64, AppError>(copied)
        }
        .await;
        let copied = finish(tx, step, result).await?;

        info!(source = source_site, target = target_site, copied, "Synced users");
        Ok(copied)
    }

    /// Delete revisions older than `days`. Returns the number deleted.
    pub async fn cleanup_old_revisions(&self, site_prefix: &str, days: u32) -> AppResult<u64> {
        let step = "revision cleanup";
        let before = cutoff(Duration::days(i64::from(days)));

        let mut tx = self.begin(step).await?;
        let result = tx.delete_revisions_before(site_prefix, before).await;
        let deleted = finish(tx, step, result).await?;

        info!(site_prefix, deleted, days, "Cleaned up old revisions");
        Ok(deleted)
    }

    /// Run every step in both directions, then close the connection.
    pub async fn run_full_sync(&self) -> SyncSummary {
        info!("Starting full content synchronization");
        let site1_prefix = self.sites.site1_prefix.as_str();
        let site2_prefix = self.sites.site2_prefix.as_str();
        let site1 = site_name(site1_prefix);
        let site2 = site_name(site2_prefix);
        let mut summary = SyncSummary::default();

        summary.featured_to_site2 = summary.record(
            "featured_content site1->site2",
            self.sync_featured_content(site1, site2).await,
        );
        summary.featured_to_site1 = summary.record(
            "featured_content site2->site1",
            self.sync_featured_content(site2, site1).await,
        );
        summary.links_updated = summary.record(
            "cross_site_links",
            self.update_cross_site_links(site1_prefix, site2_prefix).await,
        );
        summary.users_to_site2 = summary.record(
            "users site1->site2",
            self.sync_user_data(site1, site2).await,
        );
        summary.users_to_site1 = summary.record(
            "users site2->site1",
            self.sync_user_data(site2, site1).await,
        );
        let retention = self.config.revision_retention_days;
        summary.revisions_deleted = summary.record(
            "revisions site1",
            self.cleanup_old_revisions(site1_prefix, retention).await,
        ) + summary.record(
            "revisions site2",
            self.cleanup_old_revisions(site2_prefix, retention).await,
        );

        self.store.close().await;

        if summary.is_success() {
            info!(?summary, "Full content synchronization completed");
        } else {
            warn!(failed = ?summary.failed_steps, "Full content synchronization finished with failures");
        }
        summary
    }

    async fn begin(&self, step: &str) -> AppResult<Box<dyn ContentTransaction>> {
        self.store.begin().await.map_err(|e| sync_error(step, e))
    }
}

/// `age` before now, clamped to the earliest representable time.
fn cutoff(age: Duration) -> NaiveDateTime {
    Utc::now()
        .naive_utc()
        .checked_sub_signed(age)
        .unwrap_or(NaiveDateTime::MIN)
}

async fn copy_featured(
    tx: &mut dyn ContentTransaction,
    posts: &[PostRecord],
    target_prefix: &str,
    target_site: &str,
) -> AppResult<u64> {
    let mut inserted = 0;
    for post in posts {
        let copy = NewFeaturedPost::from_source(post, target_site);
        if tx.featured_exists(target_prefix, &copy.title).await? {
            continue;
        }
        tx.insert_featured(target_prefix, &copy).await?;
        debug!(title = %post.title, guid = %copy.guid, "Featured post");
        inserted += 1;
    }
    Ok(inserted)
}

/// Commit on success, roll back on failure.
async fn finish<T>(
    tx: Box<dyn ContentTransaction>,
    step: &str,
    result: AppResult<T>,
) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| sync_error(step, e))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(step, error = %rollback, "Rollback failed");
            }
            Err(sync_error(step, e))
        }
    }
}

fn sync_error(step: &str, cause: AppError) -> AppError {
    let message = format!("{step} failed: {}", cause.message);
    AppError::with_source(ErrorKind::Sync, message, cause)
}

#[cfg(test)]
mod tests {
    use contentops_core::types::content::{FEATURED_POST_TYPE, UserRecord};
    use contentops_database::InMemoryContentStore;

    use super::*;

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn post(id: u64, title: &str, content: &str, post_type: &str, age: Duration) -> PostRecord {
        PostRecord {
            id,
            title: title.to_string(),
            content: content.to_string(),
            excerpt: format!("{title} excerpt"),
            status: "publish".to_string(),
            modified: now() - age,
            post_type: post_type.to_string(),
            guid: format!("http://site.localhost/?p={id}"),
        }
    }

    fn user(login: &str, email: &str, age: Duration) -> UserRecord {
        UserRecord {
            login: login.to_string(),
            email: email.to_string(),
            registered: now() - age,
            display_name: login.to_uppercase(),
        }
    }

    fn manager() -> (InMemoryContentStore, SyncManager) {
        let store = InMemoryContentStore::new();
        let manager = SyncManager::new(
            Arc::new(store.clone()),
            SitesConfig::default(),
            SyncConfig::default(),
        );
        (store, manager)
    }

    #[tokio::test]
    async fn test_featured_sync_is_idempotent() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(10, "Launch", "body", "post", Duration::hours(2)))
            .unwrap();
        store
            .add_post("site1_", post(11, "About", "page body", "page", Duration::hours(3)))
            .unwrap();

        assert_eq!(manager.sync_featured_content("site1", "site2").await.unwrap(), 2);
        assert_eq!(manager.sync_featured_content("site1", "site2").await.unwrap(), 0);

        let featured = store.posts("site2_");
        assert_eq!(featured.len(), 2);
        let launch = featured.iter().find(|p| p.title == "[Featured] Launch").unwrap();
        assert_eq!(launch.post_type, FEATURED_POST_TYPE);
        assert_eq!(launch.guid, "featured-10-site2");
        assert_eq!(launch.content, "body");
    }

    #[tokio::test]
    async fn test_featured_sync_rolls_back_partial_inserts() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "One", "a", "post", Duration::hours(1)))
            .unwrap();
        store
            .add_post("site1_", post(2, "Two", "b", "post", Duration::hours(2)))
            .unwrap();
        store.fail_writes_after(1);

        let err = manager.sync_featured_content("site1", "site2").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Sync);
        assert!(store.posts("site2_").is_empty());
    }

    #[tokio::test]
    async fn test_featured_sync_without_recent_posts() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "Old", "a", "post", Duration::hours(48)))
            .unwrap();
        assert_eq!(manager.sync_featured_content("site1", "site2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recent_posts_degrade_to_empty() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "One", "a", "post", Duration::hours(1)))
            .unwrap();
        store.set_unreachable(true);
        assert!(manager.get_recent_posts("site1_", 24).await.is_empty());
    }

    #[tokio::test]
    async fn test_cross_site_links() {
        let (store, manager) = manager();
        store
            .add_post(
                "site1_",
                post(1, "A", "see CROSS_LINK_SITE2/news", "post", Duration::days(5)),
            )
            .unwrap();
        store
            .add_post(
                "site1_",
                post(2, "B", "near miss CROSS-LINK-SITE2", "post", Duration::days(5)),
            )
            .unwrap();
        store
            .add_post(
                "site2_",
                post(3, "C", "back to CROSS_LINK_SITE1", "post", Duration::days(5)),
            )
            .unwrap();

        let updated = manager
            .update_cross_site_links("site1_", "site2_")
            .await
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(
            store.posts("site1_")[0].content,
            "see http://site2.localhost/news"
        );
        assert_eq!(
            store.posts("site2_")[0].content,
            "back to http://site1.localhost"
        );
        assert_eq!(
            store.posts("site1_")[1].content,
            "near miss CROSS-LINK-SITE2"
        );
    }

    #[tokio::test]
    async fn test_user_sync_dedups_by_email() {
        let (store, manager) = manager();
        store
            .add_user("site1_", user("ann", "ann@example.com", Duration::hours(1)))
            .unwrap();
        store
            .add_user("site1_", user("bob", "bob@example.com", Duration::hours(2)))
            .unwrap();
        store
            .add_user("site1_", user("old", "old@example.com", Duration::days(3)))
            .unwrap();
        store
            .add_user("site2_", user("bobby", "bob@example.com", Duration::days(90)))
            .unwrap();

        assert_eq!(manager.sync_user_data("site1", "site2").await.unwrap(), 1);
        let emails: Vec<String> = store.users("site2_").into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["bob@example.com", "ann@example.com"]);
    }

    #[tokio::test]
    async fn test_revision_cleanup() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "r1", "", "revision", Duration::days(31)))
            .unwrap();
        store
            .add_post("site1_", post(2, "r2", "", "revision", Duration::days(29)))
            .unwrap();
        store
            .add_post("site1_", post(3, "p", "", "post", Duration::days(60)))
            .unwrap();

        assert_eq!(manager.cleanup_old_revisions("site1_", 30).await.unwrap(), 1);
        let remaining: Vec<u64> = store.posts("site1_").iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_huge_windows_clamp_instead_of_overflowing() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "r1", "", "revision", Duration::days(400)))
            .unwrap();
        store
            .add_post("site1_", post(2, "Launch", "", "post", Duration::days(400)))
            .unwrap();

        assert_eq!(
            manager.cleanup_old_revisions("site1_", u32::MAX).await.unwrap(),
            0
        );
        assert_eq!(manager.get_recent_posts("site1_", u32::MAX).await.len(), 1);
        assert_eq!(store.posts("site1_").len(), 2);
    }

    #[tokio::test]
    async fn test_full_sync_summary_and_close() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "Hello", "CROSS_LINK_SITE2", "post", Duration::hours(1)))
            .unwrap();
        store
            .add_user("site2_", user("cy", "cy@example.com", Duration::hours(1)))
            .unwrap();

        let summary = manager.run_full_sync().await;
        assert!(summary.is_success());
        assert_eq!(summary.featured_to_site2, 1);
        assert_eq!(summary.featured_to_site1, 0);
        assert_eq!(summary.links_updated, 1);
        assert_eq!(summary.users_to_site1, 1);
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn test_full_sync_attempts_every_step() {
        let (store, manager) = manager();
        store
            .add_post("site1_", post(1, "Hello", "x", "post", Duration::hours(1)))
            .unwrap();
        store.fail_writes_after(0);

        let summary = manager.run_full_sync().await;
        assert!(!summary.is_success());
        assert!(summary
            .failed_steps
            .contains(&"featured_content site1->site2".to_string()));
        assert!(summary.failed_steps.contains(&"cross_site_links".to_string()));
        assert!(summary.failed_steps.contains(&"revisions site2".to_string()));
        assert_eq!(store.close_count(), 1);
        assert!(store.posts("site2_").is_empty());

        store.clear_write_faults();
        let summary = manager.run_full_sync().await;
        assert!(summary.is_success(), "{:?}", summary.failed_steps);
        assert_eq!(summary.featured_to_site2, 1);
        assert_eq!(store.close_count(), 2);
    }
}
