//! # contentops-database
//!
//! Access to the content database shared by the two sites: connection
//! management for MySQL, the [`MySqlContentStore`] used in production,
//! and an [`InMemoryContentStore`] for tests and dry runs.

pub mod connection;
pub mod memory;
pub mod mysql;
pub mod schema;

pub use memory::InMemoryContentStore;
pub use mysql::MySqlContentStore;
