//! Per-request credential context and the injector that fills it.

pub mod context;
pub mod injector;
