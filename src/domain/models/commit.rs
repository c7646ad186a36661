//! Commit models on both sides of the translation.
//!
//! [`SourceCommit`] is what the source host reports; [`CommitRecord`] is the
//! tracker's development-information wire shape.

use serde::{Deserialize, Serialize};

/// One changed file as reported by the source host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub filename: String,
    /// Source-host status string (`added`, `removed`, `modified`, `renamed`, ...).
    pub status: String,
    pub additions: u32,
    pub deletions: u32,
    pub blob_url: String,
}

/// One raw commit from the source host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCommit {
    pub oid: String,
    pub message: String,
    pub url: String,
    pub authored_date: String,
    pub author_name: String,
    pub author_email: String,
    /// Source-host account of the author, when the email maps to one.
    pub author_login: Option<String>,
    pub parent_count: u32,
    /// Files included in the response. May be fewer than `file_count`.
    pub files: Vec<SourceFile>,
    /// Total changed files reported by the source host.
    pub file_count: u32,
}

/// Tracker change type for a file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Copied,
    Deleted,
    Modified,
    Moved,
    Unknown,
}

impl ChangeType {
    /// Map a source-host file status. Renames arrive as a `removed` and an
    /// `added` entry and are not coalesced.
    pub fn from_source_status(status: &str) -> Self {
        match status {
            "added" => Self::Added,
            "removed" => Self::Deleted,
            "modified" => Self::Modified,
            _ => Self::Unknown,
        }
    }
}

/// Tracker commit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitFlag {
    MergeCommit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFile {
    pub path: String,
    pub change_type: ChangeType,
    pub lines_added: u32,
    pub lines_removed: u32,
    pub url: String,
}

/// A commit in the tracker's bulk-upload schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
    pub author: CommitAuthor,
    pub author_timestamp: String,
    pub timestamp: String,
    pub display_id: String,
    pub file_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<CommitFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<CommitFlag>>,
    pub issue_keys: Vec<String>,
    pub id: String,
    pub url: String,
    pub update_sequence_id: i64,
}
