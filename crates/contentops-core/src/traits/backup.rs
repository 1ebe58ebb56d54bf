//! Backup producer trait.

use std::path::Path;

use async_trait::async_trait;

use crate::result::AppResult;

/// Exports a logical snapshot of the content database to a local file.
///
/// The dump is single-transaction and includes triggers and routines.
/// An empty `tables` slice means the whole database.
#[async_trait]
pub trait BackupProducer: Send + Sync + std::fmt::Debug + 'static {
    /// Write the dump to `target`. Fails with `ErrorKind::Backup`.
    async fn dump(&self, target: &Path, tables: &[String]) -> AppResult<()>;
}
