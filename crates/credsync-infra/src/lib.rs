//! Infrastructure layer for credsync.
//!
//! Contains implementations of the ports defined in `credsync-core`:
//! SQLite credential storage, the AES-256-GCM payload cipher, and the
//! configuration loader.

pub mod config;
pub mod crypto;
pub mod sqlite;
pub mod vault;
