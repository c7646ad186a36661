//! SQLite sync-state repository against an in-memory database.

use devsync::adapters::sqlite::{create_migrated_test_pool, SqliteSyncStateRepository};
use devsync::domain::errors::DomainError;
use devsync::domain::models::{Installation, RepositoryRef, SyncPhase, SyncStatus};
use devsync::domain::ports::SyncStateRepository;

const HOST: &str = "https://acme.atlassian.net";

async fn setup() -> SqliteSyncStateRepository {
    let pool = create_migrated_test_pool().await.expect("Failed to create test pool");
    SqliteSyncStateRepository::new(pool)
}

fn repo(id: &str, name: &str) -> RepositoryRef {
    RepositoryRef::new(id, "octo", name, format!("https://github.com/octo/{name}"))
}

fn installation() -> Installation {
    Installation::new(1234, HOST)
        .with_repository(repo("r1", "widgets"))
        .with_repository(repo("r2", "gadgets"))
}

#[tokio::test]
async fn test_load_unknown_installation_is_none() {
    let store = setup().await;
    assert!(store.load(1234, HOST).await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_installation_starts_not_started() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();

    let states = store.load(1234, HOST).await.unwrap().expect("installation exists");
    let ids: Vec<&str> = states.iter().map(|s| s.repository.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"], "insertion order is kept");
    for state in &states {
        assert_eq!(state.commits.phase(), SyncPhase::NotStarted);
        assert_eq!(state.branches.phase(), SyncPhase::NotStarted);
        assert_eq!(state.pulls.phase(), SyncPhase::NotStarted);
    }
}

#[tokio::test]
async fn test_installation_key_includes_host() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();
    assert!(store.load(1234, "https://other.atlassian.net").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_round_trips_cursor_and_status() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();

    let mut state = store.load(1234, HOST).await.unwrap().unwrap().remove(0);
    state.commits.advance("Y3Vyc29yOjIw");
    store.save(&state).await.unwrap();

    let loaded = store.load(1234, HOST).await.unwrap().unwrap().remove(0);
    assert_eq!(loaded.commits.cursor(), Some("Y3Vyc29yOjIw"));
    assert_eq!(loaded.commits.status(), SyncStatus::Pending);
    assert_eq!(loaded, state);

    state.commits.mark_complete();
    store.save(&state).await.unwrap();
    let loaded = store.load(1234, HOST).await.unwrap().unwrap().remove(0);
    assert_eq!(loaded.commits.status(), SyncStatus::Complete);
    assert_eq!(loaded.commits.cursor(), None);
}

#[tokio::test]
async fn test_readding_installation_keeps_progress() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();

    let mut state = store.load(1234, HOST).await.unwrap().unwrap().remove(0);
    state.commits.advance("c5");
    store.save(&state).await.unwrap();

    let grown = installation().with_repository(repo("r3", "sprockets"));
    store.add_installation(&grown).await.unwrap();

    let states = store.load(1234, HOST).await.unwrap().unwrap();
    assert_eq!(states.len(), 3);
    assert_eq!(states[0].commits.cursor(), Some("c5"));
}

#[tokio::test]
async fn test_save_after_removal_reports_installation_not_found() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();
    let state = store.load(1234, HOST).await.unwrap().unwrap().remove(0);

    assert!(store.remove_installation(1234, HOST).await.unwrap());
    assert!(!store.remove_installation(1234, HOST).await.unwrap());

    match store.save(&state).await {
        Err(DomainError::InstallationNotFound {
            installation_id,
            jira_host,
        }) => {
            assert_eq!(installation_id, 1234);
            assert_eq!(jira_host, HOST);
        }
        other => panic!("expected InstallationNotFound, got {other:?}"),
    }
    assert!(store.load(1234, HOST).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_installations_counts_repositories() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();
    store.add_installation(&Installation::new(99, "https://beta.atlassian.net"))
        .await
        .unwrap();

    let mut summaries = store.list_installations().await.unwrap();
    summaries.sort_by_key(|s| s.installation_id);

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].installation_id, 99);
    assert_eq!(summaries[0].repository_count, 0);
    assert_eq!(summaries[1].installation_id, 1234);
    assert_eq!(summaries[1].repository_count, 2);
}

#[tokio::test]
async fn test_reset_one_repository() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();
    for mut state in store.load(1234, HOST).await.unwrap().unwrap() {
        state.commits.advance("c9");
        state.commits.mark_failed();
        store.save(&state).await.unwrap();
    }

    assert_eq!(store.reset(1234, HOST, Some("r2")).await.unwrap(), 1);

    let states = store.load(1234, HOST).await.unwrap().unwrap();
    assert_eq!(states[0].commits.phase(), SyncPhase::Failed);
    assert_eq!(states[0].commits.cursor(), Some("c9"));
    assert_eq!(states[1].commits.phase(), SyncPhase::NotStarted);
}

#[tokio::test]
async fn test_reset_whole_installation() {
    let store = setup().await;
    store.add_installation(&installation()).await.unwrap();
    for mut state in store.load(1234, HOST).await.unwrap().unwrap() {
        state.commits.mark_complete();
        store.save(&state).await.unwrap();
    }

    assert_eq!(store.reset(1234, HOST, None).await.unwrap(), 2);
    assert!(store
        .load(1234, HOST)
        .await
        .unwrap()
        .unwrap()
        .iter()
        .all(|s| s.commits.phase() == SyncPhase::NotStarted));
}

#[tokio::test]
async fn test_reset_errors() {
    let store = setup().await;
    assert!(matches!(
        store.reset(1234, HOST, None).await,
        Err(DomainError::InstallationNotFound { .. })
    ));

    store.add_installation(&installation()).await.unwrap();
    match store.reset(1234, HOST, Some("nope")).await {
        Err(DomainError::RepositoryNotFound(id)) => assert_eq!(id, "nope"),
        other => panic!("expected RepositoryNotFound, got {other:?}"),
    }
}
