//! Business logic and port definitions for credsync.
//!
//! This crate defines the "ports" (store and cipher traits) that the
//! infrastructure layer implements, plus the three services built on them:
//! the credential vault, the per-request context injector and the sync
//! scheduler. It depends only on `credsync-types` -- never on
//! `credsync-infra` or any database/crypto crate.

pub mod credential;
pub mod repository;
pub mod service;
pub mod sync;
