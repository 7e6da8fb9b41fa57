//! Storage layer for veil
//!
//! This crate provides:
//! - The opaque async key-value store contract and its change notifications
//! - An in-memory store and a SQLite-backed store
//! - The issue repository (whole-record load/save under one key)

pub mod db;
pub mod error;
pub mod kv;
pub mod repository;

pub use db::Storage;
pub use error::{Result, StorageError};
pub use kv::{KeyValueStore, MemoryStore};
pub use repository::{IssueRepository, StoreIssueRepository};
