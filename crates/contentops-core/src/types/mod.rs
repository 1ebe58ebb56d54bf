//! Record types shared between the database, worker, and CLI crates.

pub mod content;
pub mod health;

pub use content::{NewFeaturedPost, PostRecord, UserRecord};
pub use health::HealthStatus;
