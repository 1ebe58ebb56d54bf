//! # contentops-core
//!
//! Core crate for Content Ops. Contains configuration schemas, the unified
//! error system, record types shared between crates, and the traits for the
//! external collaborators (object storage, content database, backup producer).
//!
//! This crate has **no** internal dependencies on other Content Ops crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
