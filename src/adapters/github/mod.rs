//! GitHub commit source adapter.

pub mod client;
pub mod error;
pub mod types;

pub use client::GithubClient;
pub use error::GithubApiError;
