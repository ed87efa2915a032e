//! Background sync scheduling.
//!
//! [`scheduler::SyncScheduler`] owns a registry of named periodic jobs and a
//! single dispatcher task that launches each due job in its own worker.

pub mod handler;
pub mod scheduler;
