//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Cache storage trait with SQLite and in-memory backends
//! - Request model and the pure request classifier
//! - Worker lifecycle state machine
//! - Control-message and push payload types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod policy;
pub mod push;
pub mod request;

pub use cache::{CacheDb, CacheStorage, MemoryStorage, Snapshot};
pub use config::{AppConfig, ConfigError, StorageKind};
pub use error::Error;
pub use lifecycle::WorkerState;
pub use message::ControlMessage;
pub use policy::{PolicyConfig, Strategy, classify};
pub use push::{Notification, NotificationDefaults, PushPayload};
pub use request::{Request, RequestMode};
