//! SMS Backup Merge - combine SMS Backup & Restore exports
//!
//! A Rust library for merging several XML exports of text message history
//! into one deduplicated export.
//!
//! # Features
//!
//! - Tolerant XML parsing, including surrogate-pair character references
//! - SQLite staging store with exact-duplicate rejection
//! - Cross-format dedup: MMS that repeat an SMS are dropped
//! - Glob, directory and `~`/`$VAR` input expansion
//! - Layered configuration, structured logging and metrics counters

/// Configuration management
pub mod config;
/// Staging store operations
pub mod db;
/// Identity keys and phone canonicalization
pub mod dedup;
/// Input path expansion
pub mod discovery;
/// XML tree parsing and serialization
pub mod document;
/// Merged document emission
pub mod emitter;
/// Error types
pub mod error;
/// Record ingestion
pub mod ingest;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Staging table definitions
pub mod schema;
/// Merge run orchestration
pub mod service;
/// Path validation
pub mod validation;

// Re-export key components for easier access
pub use db::{InsertOutcome, StagingStore};
pub use dedup::IdentityKey;
pub use document::Element;
pub use emitter::{MergeEmitter, MergeReport};
pub use error::{MergeError, Result};
pub use ingest::{IngestStats, Ingestor};
pub use models::{AddrRecord, MmsRecord, PartRecord, SmsRecord};
pub use service::{MergeService, RunSummary};
