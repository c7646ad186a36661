//! Source commit to tracker commit translation.

use tracing::{debug, warn};

use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::models::{
    ChangeType, CommitAuthor, CommitFile, CommitFlag, CommitRecord, SourceCommit, SourceFile,
    SourceConfig, SyncConfig, MAX_FILES_PER_COMMIT,
};
use crate::services::smart_commit::extract_issue_keys;

/// Length of the short hash shown by the tracker.
const DISPLAY_ID_LEN: usize = 6;

/// Maps raw source commits into the tracker's commit schema.
#[derive(Debug, Clone)]
pub struct EntityTranslator {
    web_url: String,
    max_files_per_commit: usize,
}

impl EntityTranslator {
    pub fn new(web_url: impl Into<String>, max_files_per_commit: usize) -> Self {
        Self {
            web_url: web_url.into().trim_end_matches('/').to_string(),
            max_files_per_commit: max_files_per_commit.min(MAX_FILES_PER_COMMIT),
        }
    }

    pub fn from_config(source: &SourceConfig, sync: &SyncConfig) -> Self {
        Self::new(source.web_url.clone(), sync.max_files_per_commit)
    }

    /// Translate one commit, extracting its issue keys from the message.
    ///
    /// Returns `Ok(None)` for commits without issue keys: they are never
    /// uploaded.
    pub fn translate(&self, commit: &SourceCommit) -> SyncResult<Option<CommitRecord>> {
        let issue_keys = extract_issue_keys(&commit.message);
        self.translate_with_keys(commit, issue_keys)
    }

    /// Translate one commit whose issue keys are already known.
    pub fn translate_with_keys(
        &self,
        commit: &SourceCommit,
        issue_keys: Vec<String>,
    ) -> SyncResult<Option<CommitRecord>> {
        if commit.oid.is_empty() {
            return Err(SyncError::TranslateError(format!(
                "commit without hash (url: {})",
                commit.url
            )));
        }
        if issue_keys.is_empty() {
            return Ok(None);
        }

        let display_id = commit.oid.get(..DISPLAY_ID_LEN).unwrap_or(&commit.oid).to_string();
        let flags = (commit.parent_count > 1).then(|| vec![CommitFlag::MergeCommit]);

        Ok(Some(CommitRecord {
            hash: commit.oid.clone(),
            message: commit.message.clone(),
            author: self.author(commit),
            author_timestamp: commit.authored_date.clone(),
            timestamp: commit.authored_date.clone(),
            display_id,
            file_count: commit.file_count,
            files: commit
                .files
                .iter()
                .take(self.max_files_per_commit)
                .map(map_file)
                .collect(),
            flags,
            issue_keys,
            id: commit.oid.clone(),
            url: commit.url.clone(),
            update_sequence_id: 0,
        }))
    }

    /// Translate a page, dropping commits without keys and commits that fail
    /// to translate. A bad record never fails the page.
    pub fn translate_page(&self, commits: &[SourceCommit]) -> Vec<CommitRecord> {
        let mut records = Vec::with_capacity(commits.len());
        for commit in commits {
            match self.translate(commit) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(sha = %commit.oid, "commit has no issue keys; skipping"),
                Err(err) => warn!(error = %err, "dropping untranslatable commit"),
            }
        }
        records
    }

    fn author(&self, commit: &SourceCommit) -> CommitAuthor {
        let login = commit.author_login.as_deref().filter(|l| !l.is_empty());
        CommitAuthor {
            name: commit.author_name.clone(),
            email: commit.author_email.clone(),
            avatar: login.map(|l| format!("{}/{l}.png", self.web_url)),
            url: login.map(|l| format!("{}/{l}", self.web_url)),
        }
    }
}

fn map_file(file: &SourceFile) -> CommitFile {
    CommitFile {
        path: file.filename.clone(),
        change_type: ChangeType::from_source_status(&file.status),
        lines_added: file.additions,
        lines_removed: file.deletions,
        url: file.blob_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, status: &str) -> SourceFile {
        SourceFile {
            filename: name.to_string(),
            status: status.to_string(),
            additions: 3,
            deletions: 1,
            blob_url: format!("https://github.com/octo/widgets/blob/abc/{name}"),
        }
    }

    fn commit(message: &str) -> SourceCommit {
        SourceCommit {
            oid: "abcdef1234567890".to_string(),
            message: message.to_string(),
            url: "https://github.com/octo/widgets/commit/abcdef1234567890".to_string(),
            authored_date: "2024-03-01T10:00:00Z".to_string(),
            author_name: "Alice".to_string(),
            author_email: "alice@example.com".to_string(),
            author_login: Some("alice".to_string()),
            parent_count: 1,
            files: vec![file("a.txt", "modified")],
            file_count: 1,
        }
    }

    fn translator() -> EntityTranslator {
        EntityTranslator::new("https://github.com", 10)
    }

    #[test]
    fn test_translates_keyed_commit() {
        let record = translator().translate(&commit("[TES-17] fix bug")).unwrap().unwrap();

        assert_eq!(record.issue_keys, vec!["TES-17"]);
        assert_eq!(record.flags, None);
        assert_eq!(record.display_id, "abcdef");
        assert_eq!(record.id, record.hash);
        assert_eq!(record.timestamp, record.author_timestamp);
        assert_eq!(record.author.avatar.as_deref(), Some("https://github.com/alice.png"));
        assert_eq!(record.author.url.as_deref(), Some("https://github.com/alice"));
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.files[0].change_type, ChangeType::Modified);
        assert_eq!(record.files[0].path, "a.txt");
    }

    #[test]
    fn test_drops_commit_without_keys() {
        assert!(translator().translate(&commit("fix bug")).unwrap().is_none());
    }

    #[test]
    fn test_merge_commit_flag() {
        let mut merge = commit("Merge TES-2");
        merge.parent_count = 2;
        let record = translator().translate(&merge).unwrap().unwrap();
        assert_eq!(record.flags, Some(vec![CommitFlag::MergeCommit]));
    }

    #[test]
    fn test_author_links_omitted_without_login() {
        let mut anonymous = commit("TES-3 docs");
        anonymous.author_login = None;
        let record = translator().translate(&anonymous).unwrap().unwrap();
        assert_eq!(record.author.avatar, None);
        assert_eq!(record.author.url, None);

        let json = serde_json::to_value(&record.author).unwrap();
        assert!(json.get("avatar").is_none());
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_file_list_truncated_but_count_preserved() {
        let mut big = commit("TES-4 big change");
        big.files = (0..25).map(|i| file(&format!("f{i}.rs"), "added")).collect();
        big.file_count = 25;
        let record = translator().translate(&big).unwrap().unwrap();
        assert_eq!(record.files.len(), 10);
        assert_eq!(record.file_count, 25);
    }

    #[test]
    fn test_rename_is_not_coalesced() {
        let mut renamed = commit("TES-5 move module");
        renamed.files = vec![file("old.rs", "removed"), file("new.rs", "added")];
        renamed.file_count = 2;
        let record = translator().translate(&renamed).unwrap().unwrap();
        let types: Vec<_> = record.files.iter().map(|f| f.change_type).collect();
        assert_eq!(types, vec![ChangeType::Deleted, ChangeType::Added]);
    }

    #[test]
    fn test_short_hash_display_id() {
        let mut short = commit("TES-6");
        short.oid = "abc".to_string();
        let record = translator().translate(&short).unwrap().unwrap();
        assert_eq!(record.display_id, "abc");
    }

    #[test]
    fn test_empty_hash_is_translate_error_and_dropped_from_page() {
        let mut broken = commit("TES-7 broken");
        broken.oid = String::new();
        assert!(matches!(
            translator().translate(&broken),
            Err(SyncError::TranslateError(_))
        ));

        let page = vec![broken, commit("TES-8 fine"), commit("no keys")];
        let records = translator().translate_page(&page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].issue_keys, vec!["TES-8"]);
    }

    #[test]
    fn test_max_files_capped_at_tracker_limit() {
        let translator = EntityTranslator::new("https://github.com/", 50);
        let mut big = commit("TES-9");
        big.files = (0..20).map(|i| file(&format!("f{i}"), "modified")).collect();
        big.file_count = 20;
        let record = translator.translate(&big).unwrap().unwrap();
        assert_eq!(record.files.len(), MAX_FILES_PER_COMMIT);
        assert_eq!(record.author.url.as_deref(), Some("https://github.com/alice"));
    }
}
