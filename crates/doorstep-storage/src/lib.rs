//! Doorstep Storage Library
//!
//! This crate provides the blob-store abstraction for evidence documents:
//! the Storage trait and implementations for S3 and local filesystem.
//!
//! # Storage key format
//!
//! Document blobs are request-scoped:
//! `documents/{check_in_request_id}/{document_id}_{file_name}`.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use doorstep_core::StorageBackend;
pub use factory::create_storage;
pub use keys::document_key;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
