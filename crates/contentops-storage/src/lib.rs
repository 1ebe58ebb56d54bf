//! # contentops-storage
//!
//! Object storage for Content Ops: an S3-compatible provider for Cloudflare
//! R2 (or any S3 API), an in-memory provider, and [`StorageClient`], the
//! thin contract the backup manager and scheduler use.

pub mod client;
pub mod providers;

pub use client::StorageClient;
