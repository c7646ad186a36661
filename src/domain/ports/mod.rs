//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - CommitSource: paginated source-host history
//! - DevInfoClient: tracker bulk upload
//! - SyncStateRepository: installation and per-repository sync state
//! - ProjectOccurrenceCounter: per-project counters
//! - JobQueue: delayed job queue
//! - Clock: update-sequence time source

pub mod clock;
pub mod commit_source;
pub mod devinfo_client;
pub mod job_queue;
pub mod project_counter;
pub mod sync_state_repository;

pub use clock::{Clock, SystemClock};
pub use commit_source::CommitSource;
pub use devinfo_client::DevInfoClient;
pub use job_queue::{JobConsumer, JobQueue};
pub use project_counter::ProjectOccurrenceCounter;
pub use sync_state_repository::SyncStateRepository;
