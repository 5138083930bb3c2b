//! crates/storywriter_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use crate::domain::{
    ChatTurn, GeneratedStory, NewStoryRecord, StoryGenerationRequest, StoryHistoryItem,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The backing service (document store, backend proxy) cannot be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    /// A credential or endpoint the operation depends on is not configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A remote service answered with a non-success status.
    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The server-side history collection, keyed by user id.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Whether the store currently accepts reads and writes.
    async fn is_connected(&self) -> bool;

    /// Returns at most `limit` stories of the user, newest first.
    async fn list_stories(&self, user_id: &str, limit: i64) -> PortResult<Vec<StoryHistoryItem>>;

    async fn create_story(&self, record: NewStoryRecord) -> PortResult<StoryHistoryItem>;

    /// Deletes one story. Yields `NotFound` unless `id` exists and belongs to `user_id`.
    async fn delete_story(&self, user_id: &str, id: &str) -> PortResult<()>;

    /// Deletes every story of the user. Succeeds when there is nothing to delete.
    async fn clear_stories(&self, user_id: &str) -> PortResult<()>;
}

/// The hosted chat-completion model, as seen by the proxy.
#[async_trait]
pub trait StoryModelService: Send + Sync {
    /// Writes a story and splits the reply into title and body.
    async fn generate_story(&self, request: &StoryGenerationRequest) -> PortResult<GeneratedStory>;

    /// Continues a refinement conversation and returns the assistant reply.
    async fn chat(&self, messages: &[ChatTurn]) -> PortResult<String>;
}

/// The backend history endpoints, as seen by the client.
#[async_trait]
pub trait StoryHistoryRemote: Send + Sync {
    async fn fetch_history(&self, user_id: &str) -> PortResult<Vec<StoryHistoryItem>>;

    async fn save_story(&self, record: NewStoryRecord) -> PortResult<StoryHistoryItem>;

    /// Deletes one story. A missing story is not an error.
    async fn delete_story(&self, user_id: &str, id: &str) -> PortResult<()>;

    async fn clear_history(&self, user_id: &str) -> PortResult<()>;
}
