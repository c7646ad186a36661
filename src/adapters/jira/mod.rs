//! Tracker (Jira) development-information adapter.

pub mod client;
pub mod error;
pub mod jwt;

pub use client::JiraDevInfoClient;
pub use error::JiraApiError;
