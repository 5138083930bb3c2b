//! crates/storywriter_client/src/lib.rs
//!
//! Client side of the story writer: the rate-limited generation client, local
//! persistence, device-local accounts, and the history synchronizer.

pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod history_api;
pub mod history_sync;
pub mod local_store;
pub mod queue;
pub mod workshop;

pub use auth::LocalAuth;
pub use config::ClientSettings;
pub use error::{AuthError, ClientError, StoreError, SyncError};
pub use generation::GenerationClient;
pub use history_api::HttpHistoryApi;
pub use history_sync::{HistorySynchronizer, SyncTask, LOCAL_HISTORY_CAP};
pub use local_store::{FileStore, LocalStore, MemoryStore};
pub use queue::RequestQueue;
pub use workshop::{ChatSession, DraftSource, GeneratedDraft, StoryWorkshop};
