//! Cursor-driven paging over a repository's commit history.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::models::{Page, RepositoryRef, SourceCommit};
use crate::domain::ports::CommitSource;

/// Issues one history query per call and normalizes the end-of-history
/// signal.
///
/// The default branch is resolved once per repository and cached for the
/// lifetime of the paginator.
pub struct CursorPaginator {
    source: Arc<dyn CommitSource>,
    page_size: u32,
    fallback_branch: String,
    branches: RwLock<HashMap<(i64, String), String>>,
}

impl CursorPaginator {
    pub fn new(source: Arc<dyn CommitSource>, page_size: u32, fallback_branch: impl Into<String>) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            fallback_branch: fallback_branch.into(),
            branches: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the page after `cursor` (`None` = first page).
    ///
    /// An empty page always ends the history, whatever the source claims, so a
    /// misbehaving source cannot keep the crawl spinning on empty pages.
    #[instrument(skip(self, repository), fields(repository = %repository.full_name()), err)]
    pub async fn next_page(
        &self,
        installation_id: i64,
        repository: &RepositoryRef,
        cursor: Option<&str>,
    ) -> SyncResult<Page<SourceCommit>> {
        let branch = self.branch_for(installation_id, repository).await?;
        let page = self
            .source
            .history_page(installation_id, repository, &branch, cursor, self.page_size)
            .await?;

        if page.records.is_empty() {
            debug!(branch = %branch, "empty page; end of history");
            return Ok(Page::last(Vec::new()));
        }
        if page.has_more && page.next_cursor.is_none() {
            return Err(SyncError::FetchFailed(
                "page reports more history but carries no cursor".to_string(),
            ));
        }
        debug!(records = page.records.len(), has_more = page.has_more, "fetched history page");
        Ok(page)
    }

    /// Default branch of the repository, falling back to the configured name
    /// when the remote reports none.
    pub async fn branch_for(&self, installation_id: i64, repository: &RepositoryRef) -> SyncResult<String> {
        let key = (installation_id, repository.id.clone());
        if let Some(branch) = self.branches.read().await.get(&key) {
            return Ok(branch.clone());
        }

        let branch = self
            .source
            .default_branch(installation_id, repository)
            .await?
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| {
                debug!(fallback = %self.fallback_branch, "no default branch reported");
                self.fallback_branch.clone()
            });

        self.branches.write().await.insert(key, branch.clone());
        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        default_branch: Option<String>,
        pages: Mutex<Vec<SyncResult<Page<SourceCommit>>>>,
        branch_lookups: AtomicUsize,
        requested: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedSource {
        fn new(default_branch: Option<&str>, pages: Vec<SyncResult<Page<SourceCommit>>>) -> Self {
            Self {
                default_branch: default_branch.map(str::to_string),
                pages: Mutex::new(pages),
                branch_lookups: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommitSource for ScriptedSource {
        async fn default_branch(&self, _: i64, _: &RepositoryRef) -> SyncResult<Option<String>> {
            self.branch_lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.default_branch.clone())
        }

        async fn history_page(
            &self,
            _: i64,
            _: &RepositoryRef,
            branch: &str,
            cursor: Option<&str>,
            _: u32,
        ) -> SyncResult<Page<SourceCommit>> {
            self.requested
                .lock()
                .unwrap()
                .push((branch.to_string(), cursor.map(str::to_string)));
            self.pages.lock().unwrap().remove(0)
        }

        async fn get_commit(&self, _: i64, _: &RepositoryRef, _: &str) -> SyncResult<SourceCommit> {
            unreachable!("not used by the paginator")
        }
    }

    fn repo() -> RepositoryRef {
        RepositoryRef::new("r-1", "octo", "widgets", "https://github.com/octo/widgets")
    }

    fn commit(oid: &str) -> SourceCommit {
        SourceCommit {
            oid: oid.to_string(),
            message: "TES-1".to_string(),
            url: String::new(),
            authored_date: String::new(),
            author_name: String::new(),
            author_email: String::new(),
            author_login: None,
            parent_count: 1,
            files: vec![],
            file_count: 0,
        }
    }

    #[tokio::test]
    async fn test_resolves_default_branch_once() {
        let source = Arc::new(ScriptedSource::new(
            Some("main"),
            vec![
                Ok(Page::new(vec![commit("a")], Some("c1".into()), true)),
                Ok(Page::last(vec![commit("b")])),
            ],
        ));
        let paginator = CursorPaginator::new(source.clone(), 20, "master");

        let first = paginator.next_page(1, &repo(), None).await.unwrap();
        assert_eq!(first.next_cursor.as_deref(), Some("c1"));
        let second = paginator.next_page(1, &repo(), Some("c1")).await.unwrap();
        assert!(second.is_end_of_history());

        assert_eq!(source.branch_lookups.load(Ordering::SeqCst), 1);
        let requested = source.requested.lock().unwrap().clone();
        assert_eq!(
            requested,
            vec![("main".to_string(), None), ("main".to_string(), Some("c1".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_falls_back_when_no_default_branch() {
        let source = Arc::new(ScriptedSource::new(None, vec![Ok(Page::last(vec![commit("a")]))]));
        let paginator = CursorPaginator::new(source.clone(), 20, "master");

        paginator.next_page(1, &repo(), None).await.unwrap();
        assert_eq!(source.requested.lock().unwrap()[0].0, "master");
    }

    #[tokio::test]
    async fn test_empty_page_ends_history() {
        let source = Arc::new(ScriptedSource::new(
            Some("main"),
            vec![Ok(Page::new(vec![], Some("c9".into()), true))],
        ));
        let paginator = CursorPaginator::new(source, 20, "master");

        let page = paginator.next_page(1, &repo(), Some("c8")).await.unwrap();
        assert!(page.records.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_more_without_cursor_is_fetch_failure() {
        let source = Arc::new(ScriptedSource::new(
            Some("main"),
            vec![Ok(Page::new(vec![commit("a")], None, true))],
        ));
        let paginator = CursorPaginator::new(source, 20, "master");

        let err = paginator.next_page(1, &repo(), None).await.unwrap_err();
        assert!(matches!(err, SyncError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_source_errors_pass_through() {
        let source = Arc::new(ScriptedSource::new(
            Some("main"),
            vec![Err(SyncError::RateLimited { retry_after: None })],
        ));
        let paginator = CursorPaginator::new(source, 20, "master");

        let err = paginator.next_page(1, &repo(), None).await.unwrap_err();
        assert!(err.is_rate_limit());
    }
}
