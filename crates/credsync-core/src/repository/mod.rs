//! Port definitions.
//!
//! These traits define the storage and encryption interfaces that the
//! infrastructure layer (credsync-infra) implements. The core crate never
//! depends on any specific storage technology or cipher.

pub mod cipher;
pub mod credential;
