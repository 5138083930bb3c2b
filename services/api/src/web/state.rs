//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use storywriter_core::ports::{StoryModelService, StoryStore};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no database is configured or the connection failed at startup.
    pub store: Option<Arc<dyn StoryStore>>,
    pub model: Arc<dyn StoryModelService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Returns the store only if it is configured and currently connected.
    pub async fn connected_store(&self) -> Option<Arc<dyn StoryStore>> {
        let store = self.store.as_ref()?;
        if store.is_connected().await {
            Some(store.clone())
        } else {
            None
        }
    }
}
