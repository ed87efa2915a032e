//! Shared domain types for credsync.
//!
//! This crate contains the types used across the credential vault and the
//! sync scheduler: the credential catalogue and payload shapes, persisted
//! records and their metadata projection, job status snapshots, configuration
//! and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod credential;
pub mod error;
pub mod job;
pub mod secret;
