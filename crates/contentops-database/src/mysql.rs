//! MySQL implementation of the content store.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, Row, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info};

use contentops_core::config::DatabaseConfig;
use contentops_core::error::{AppError, ErrorKind};
use contentops_core::result::AppResult;
use contentops_core::traits::content::{ContentStore, ContentTransaction};
use contentops_core::types::content::{
    FEATURED_POST_TYPE, NewFeaturedPost, PostRecord, UserRecord,
};

use crate::connection;
use crate::schema::{posts_table, users_table};

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, format!("{context}: {e}"), e)
}

/// Content store backed by a lazily opened MySQL connection.
///
/// The connection is opened on first use and kept until [`ContentStore::close`].
#[derive(Debug)]
pub struct MySqlContentStore {
    config: DatabaseConfig,
    pool: Mutex<Option<MySqlPool>>,
}

impl MySqlContentStore {
    /// Create a store. No connection is made until the first call.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    async fn pool(&self) -> AppResult<MySqlPool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }
        let pool = connection::connect(&self.config).await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

fn post_from_row(row: &MySqlRow) -> Result<PostRecord, sqlx::Error> {
    Ok(PostRecord {
        id: row.try_get("ID")?,
        title: row.try_get("post_title")?,
        content: row.try_get("post_content")?,
        excerpt: row.try_get("post_excerpt")?,
        status: row.try_get("post_status")?,
        modified: row.try_get("post_modified")?,
        post_type: row.try_get("post_type")?,
        guid: row.try_get("guid")?,
    })
}

/// Placeholder replacement. `LOCATE` matches the placeholder literally, so
/// `_` is not a wildcard and only rows that REPLACE changes are counted.
fn replace_in_content_sql(table: &str) -> String {
    format!(
        "UPDATE {table} SET post_content = REPLACE(post_content, ?, ?) \
         WHERE LOCATE(?, post_content) > 0"
    )
}

fn user_from_row(row: &MySqlRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        login: row.try_get("user_login")?,
        email: row.try_get("user_email")?,
        registered: row.try_get("user_registered")?,
        display_name: row.try_get("display_name")?,
    })
}

#[async_trait]
impl ContentStore for MySqlContentStore {
    async fn ping(&self) -> AppResult<()> {
        let pool = self.pool().await?;
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(db_error("Health check failed"))?;
        Ok(())
    }

    async fn recent_posts(
        &self,
        site_prefix: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<PostRecord>> {
        let table = posts_table(site_prefix)?;
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT ID, post_title, post_content, post_excerpt, post_status, \
             post_modified, post_type, guid \
             FROM {table} \
             WHERE post_modified >= ? \
             AND post_status = 'publish' \
             AND post_type IN ('post', 'page') \
             ORDER BY post_modified DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(since)
            .fetch_all(&pool)
            .await
            .map_err(db_error("Failed to fetch recent posts"))?;

        rows.iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to decode post row"))
    }

    async fn begin(&self) -> AppResult<Box<dyn ContentTransaction>> {
        let pool = self.pool().await?;
        let tx = pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        Ok(Box::new(MySqlContentTransaction { tx }))
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            info!("Database connection closed");
        }
    }
}

/// An open MySQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct MySqlContentTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl ContentTransaction for MySqlContentTransaction {
    async fn featured_exists(&mut self, site_prefix: &str, title: &str) -> AppResult<bool> {
        let table = posts_table(site_prefix)?;
        let sql = format!("SELECT ID FROM {table} WHERE post_title = ? AND post_type = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(title)
            .bind(FEATURED_POST_TYPE)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("Failed to look up featured post"))?;
        Ok(row.is_some())
    }

    async fn insert_featured(
        &mut self,
        site_prefix: &str,
        post: &NewFeaturedPost,
    ) -> AppResult<()> {
        let table = posts_table(site_prefix)?;
        let sql = format!(
            "INSERT INTO {table} \
             (post_author, post_date, post_date_gmt, post_content, post_title, post_excerpt, \
              post_status, post_type, post_modified, post_modified_gmt, guid) \
             VALUES (1, NOW(), UTC_TIMESTAMP(), ?, ?, ?, 'publish', ?, NOW(), UTC_TIMESTAMP(), ?)"
        );
        sqlx::query(&sql)
            .bind(&post.content)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(FEATURED_POST_TYPE)
            .bind(&post.guid)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to insert featured post"))?;
        debug!(table = %table, guid = %post.guid, "Inserted featured post");
        Ok(())
    }

    async fn replace_in_content(
        &mut self,
        site_prefix: &str,
        placeholder: &str,
        replacement: &str,
    ) -> AppResult<u64> {
        let sql = replace_in_content_sql(&posts_table(site_prefix)?);
        let result = sqlx::query(&sql)
            .bind(placeholder)
            .bind(replacement)
            .bind(placeholder)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to update cross-site links"))?;
        Ok(result.rows_affected())
    }

    async fn users_registered_since(
        &mut self,
        site_prefix: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<UserRecord>> {
        let table = users_table(site_prefix)?;
        let sql = format!(
            "SELECT user_login, user_email, user_registered, display_name \
             FROM {table} WHERE user_registered >= ?"
        );
        let rows = sqlx::query(&sql)
            .bind(since)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error("Failed to fetch new users"))?;
        rows.iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to decode user row"))
    }

    async fn user_exists(&mut self, site_prefix: &str, email: &str) -> AppResult<bool> {
        let table = users_table(site_prefix)?;
        let sql = format!("SELECT ID FROM {table} WHERE user_email = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error("Failed to look up user"))?;
        Ok(row.is_some())
    }

    async fn insert_user(&mut self, site_prefix: &str, user: &UserRecord) -> AppResult<()> {
        let table = users_table(site_prefix)?;
        let sql = format!(
            "INSERT INTO {table} (user_login, user_email, user_registered, display_name, user_status) \
             VALUES (?, ?, ?, ?, 0)"
        );
        sqlx::query(&sql)
            .bind(&user.login)
            .bind(&user.email)
            .bind(user.registered)
            .bind(&user.display_name)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to insert user"))?;
        Ok(())
    }

    async fn delete_revisions_before(
        &mut self,
        site_prefix: &str,
        cutoff: NaiveDateTime,
    ) -> AppResult<u64> {
        let table = posts_table(site_prefix)?;
        let sql =
            format!("DELETE FROM {table} WHERE post_type = 'revision' AND post_modified < ?");
        let result = sqlx::query(&sql)
            .bind(cutoff)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to delete revisions"))?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { tx } = *self;
        tx.commit().await.map_err(db_error("Failed to commit"))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let Self { tx } = *self;
        tx.rollback().await.map_err(db_error("Failed to roll back"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_prefix_rejected_before_connecting() {
        let store = MySqlContentStore::new(DatabaseConfig::default());
        let err = store
            .recent_posts("site1_ OR 1=1", NaiveDateTime::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_close_without_connection_is_noop() {
        let store = MySqlContentStore::new(DatabaseConfig::default());
        store.close().await;
        assert!(store.pool.lock().await.is_none());
    }

    #[test]
    fn test_placeholder_match_is_literal() {
        let sql = replace_in_content_sql("site1_posts");
        assert!(sql.contains("WHERE LOCATE(?, post_content) > 0"));
        assert!(!sql.contains("LIKE"));
    }
}
