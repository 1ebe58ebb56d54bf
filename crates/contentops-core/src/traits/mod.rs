//! Collaborator traits defined in `contentops-core` and implemented by
//! the storage, database, and worker crates.

pub mod backup;
pub mod content;
pub mod storage;

pub use backup::BackupProducer;
pub use content::{ContentStore, ContentTransaction};
pub use storage::ObjectStore;
