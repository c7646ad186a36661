//! Domain layer for the devsync sync engine
//!
//! This module contains core business models, error types and the port traits
//! adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, SyncError, SyncResult};
