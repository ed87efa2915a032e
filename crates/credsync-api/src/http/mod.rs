//! HTTP management surface for credsync.
//!
//! Axum-based REST API at `/api/v1/` with envelope responses. Tenant and user
//! identity arrive as headers from the upstream auth layer.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
