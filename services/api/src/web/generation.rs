//! services/api/src/web/generation.rs
//!
//! Handlers that relay story generation and chat requests to the upstream model.

use crate::{
    error::ApiError,
    web::{rest::json_body, state::AppState},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storywriter_core::domain::{
    ChatTurn, StoryGenerationRequest, StoryGenerationResponse, StoryMetadata,
};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub content: String,
}

/// Generate a story with the upstream model.
#[utoipa::path(
    post,
    path = "/api/stories/generate",
    request_body = StoryGenerationRequest,
    responses(
        (status = 200, description = "Story generated", body = StoryGenerationResponse),
        (status = 400, description = "Invalid request or upstream API key not configured"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_story_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StoryGenerationRequest>, JsonRejection>,
) -> Result<Json<StoryGenerationResponse>, ApiError> {
    let request = json_body(payload)?;
    let generated = state.model.generate_story(&request).await?;

    Ok(Json(StoryGenerationResponse {
        story: generated.story,
        title: Some(generated.title),
        metadata: Some(StoryMetadata {
            tokens: (generated.raw_chars / 4) as u64,
            generated_at: Utc::now(),
        }),
    }))
}

/// Continue a story refinement conversation.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Invalid request or upstream API key not configured"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = json_body(payload)?;
    let content = state.model.chat(&request.messages).await?;
    Ok(Json(ChatResponse { content }))
}
