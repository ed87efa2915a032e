//! HTTP request handlers for the REST API.

pub mod credential;
pub mod sync;
