//! Sync engine services.
//!
//! Leaf-first: smart-commit parsing and translation, paging, uploading and
//! backoff, then the controller and workers that drive them.

pub mod backoff;
pub mod batch_uploader;
pub mod paginator;
pub mod push_processor;
pub mod smart_commit;
pub mod sync_controller;
pub mod translator;
pub mod worker_pool;

pub use backoff::InstallationBackoff;
pub use batch_uploader::{BatchUploader, UploadReport};
pub use paginator::CursorPaginator;
pub use push_processor::{create_push_job, PushEvent, PushOutcome, PushProcessor};
pub use smart_commit::{extract_issue_keys, project_key, reduce_project_keys};
pub use sync_controller::{JobContinuationController, JobOutcome};
pub use translator::EntityTranslator;
pub use worker_pool::{Settlement, WorkerHandle, WorkerPool, WorkerStats};
