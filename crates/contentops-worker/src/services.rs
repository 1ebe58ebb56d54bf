//! Service wiring shared by the daemon and the CLI.

use std::sync::Arc;

use tracing::info;

use contentops_core::config::AppConfig;
use contentops_core::result::AppResult;
use contentops_core::traits::backup::BackupProducer;
use contentops_core::traits::content::ContentStore;
use contentops_database::MySqlContentStore;
use contentops_storage::StorageClient;
use contentops_storage::providers::S3ObjectStore;

use crate::backup::BackupManager;
use crate::clock::Clock;
use crate::dump::MysqldumpProducer;
use crate::health::HealthChecker;
use crate::jobs;
use crate::scheduler::SchedulerCore;
use crate::sync::SyncManager;

/// Every manager the jobs and commands operate on.
#[derive(Debug, Clone)]
pub struct Services {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Non-raising object storage facade.
    pub storage: StorageClient,
    /// Content database.
    pub content: Arc<dyn ContentStore>,
    /// Backup creation, upload, and retention.
    pub backup: BackupManager,
    /// Cross-site synchronization.
    pub sync: SyncManager,
    /// Connectivity checks.
    pub health: HealthChecker,
}

impl Services {
    /// Connect to the configured object store and prepare the content
    /// database. The database connection is opened lazily on first use.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        info!(
            endpoint = %config.storage.endpoint,
            bucket = %config.storage.bucket,
            "Connecting to object storage"
        );
        let store = S3ObjectStore::connect(&config.storage).await?;
        let storage = StorageClient::new(Arc::new(store));
        info!(provider = storage.provider_type(), "Object storage ready");

        let content: Arc<dyn ContentStore> =
            Arc::new(MySqlContentStore::new(config.database.clone()));
        let producer: Arc<dyn BackupProducer> = Arc::new(MysqldumpProducer::new(
            config.backup.dump_command.clone(),
            &config.database,
        ));

        Ok(Self::from_parts(config, storage, content, producer))
    }

    /// Assemble services around already-constructed collaborators.
    pub fn from_parts(
        config: AppConfig,
        storage: StorageClient,
        content: Arc<dyn ContentStore>,
        producer: Arc<dyn BackupProducer>,
    ) -> Self {
        let backup = BackupManager::new(producer, storage.clone(), &config.backup);
        let sync = SyncManager::new(content.clone(), config.sites.clone(), config.sync.clone());
        let health = HealthChecker::new(content.clone(), storage.clone());

        Self {
            config: Arc::new(config),
            storage,
            content,
            backup,
            sync,
            health,
        }
    }

    /// A scheduler with the default job set registered.
    pub fn scheduler(&self) -> AppResult<SchedulerCore> {
        let mut core = SchedulerCore::new();
        jobs::register_default_jobs(&mut core, self, &self.config.scheduler)?;
        Ok(core)
    }

    /// Same as [`Services::scheduler`] with an explicit clock.
    pub fn scheduler_with_clock(&self, clock: Arc<dyn Clock>) -> AppResult<SchedulerCore> {
        let mut core = SchedulerCore::with_clock(clock);
        jobs::register_default_jobs(&mut core, self, &self.config.scheduler)?;
        Ok(core)
    }
}
