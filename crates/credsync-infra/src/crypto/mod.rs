//! Cryptographic primitives.

pub mod cipher;
