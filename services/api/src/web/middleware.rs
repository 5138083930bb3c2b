//! services/api/src/web/middleware.rs
//!
//! Guard middleware for the story history routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use storywriter_core::ports::StoryStore;
use tracing::warn;

use crate::{error::ApiError, web::state::AppState};

/// The connected story store, placed in request extensions by `require_store`.
#[derive(Clone)]
pub struct StoreHandle(pub Arc<dyn StoryStore>);

/// Middleware that short-circuits history requests with 503 while the store is
/// missing or disconnected.
///
/// If available, inserts a `StoreHandle` into request extensions for handlers to use.
pub async fn require_store(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(store) = state.connected_store().await else {
        warn!("Rejecting {} {}: story store unavailable", req.method(), req.uri().path());
        return ApiError::StoreUnavailable.into_response();
    };

    req.extensions_mut().insert(StoreHandle(store));
    next.run(req).await
}
