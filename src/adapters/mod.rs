//! Infrastructure adapters for external systems.

pub mod github;
pub mod jira;
pub mod sqlite;
