//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the story history and health endpoints and the
//! master definition for the OpenAPI specification.

use crate::{
    error::ApiError,
    web::{
        generation::{self, ChatRequest, ChatResponse},
        middleware::StoreHandle,
        state::AppState,
    },
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storywriter_core::domain::{
    NewStoryRecord, StoryGenerationRequest, StoryGenerationResponse, StoryHistoryItem,
    StoryOptions,
};
use tracing::info;
use utoipa::{OpenApi, ToSchema};

/// Upper bound on stories returned by one listing.
pub const STORY_LIST_LIMIT: i64 = 50;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_stories_handler,
        create_story_handler,
        delete_story_handler,
        clear_stories_handler,
        generation::generate_story_handler,
        generation::chat_handler,
    ),
    components(
        schemas(
            HealthResponse,
            StoryListResponse,
            CreateStoryRequest,
            StoryCreatedResponse,
            StoryHistoryItem,
            StoryOptions,
            StoryGenerationRequest,
            StoryGenerationResponse,
            ChatRequest,
            ChatResponse,
        )
    ),
    tags(
        (name = "StoryWriter API", description = "Story generation proxy and story history endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    /// `connected` or `disconnected`. The field name is what existing frontends read.
    mongodb: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct StoryListResponse {
    stories: Vec<StoryHistoryItem>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoryRequest {
    user_id: Option<String>,
    options: Option<StoryOptions>,
    content: Option<String>,
    snippet: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StoryCreatedResponse {
    story: StoryHistoryItem,
}

/// Picks the user id from the query string, falling back to the body.
/// Blank ids are treated as missing.
pub fn require_user_id(
    query: Option<String>,
    body: Option<String>,
) -> Result<String, ApiError> {
    query
        .or(body)
        .map(|raw| raw.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))
}

/// Unwraps a JSON body, turning extractor rejections into 400 responses.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Report liveness and document store connectivity.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connected = state.connected_store().await.is_some();
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        mongodb: if connected { "connected" } else { "disconnected" },
    })
}

/// List the user's stories, newest first.
#[utoipa::path(
    get,
    path = "/api/stories",
    params(
        ("userId" = String, Query, description = "The id of the story owner.")
    ),
    responses(
        (status = 200, description = "Stories of the user", body = StoryListResponse),
        (status = 400, description = "userId missing"),
        (status = 503, description = "Story store not connected")
    )
)]
pub async fn list_stories_handler(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Query(query): Query<UserQuery>,
) -> Result<Json<StoryListResponse>, ApiError> {
    let user_id = require_user_id(query.user_id, None)?;
    let stories = store.list_stories(&user_id, STORY_LIST_LIMIT).await?;
    Ok(Json(StoryListResponse { stories }))
}

/// Save a generated story to the user's history.
#[utoipa::path(
    post,
    path = "/api/stories",
    request_body = CreateStoryRequest,
    responses(
        (status = 201, description = "Story saved", body = StoryCreatedResponse),
        (status = 400, description = "userId or story fields missing"),
        (status = 503, description = "Story store not connected")
    )
)]
pub async fn create_story_handler(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Query(query): Query<UserQuery>,
    payload: Result<Json<CreateStoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let user_id = require_user_id(query.user_id, request.user_id)?;

    let (Some(options), Some(content), Some(snippet)) =
        (request.options, request.content, request.snippet)
    else {
        return Err(ApiError::BadRequest(
            "options, content, and snippet are required".to_string(),
        ));
    };

    let story = store
        .create_story(NewStoryRecord {
            user_id,
            options,
            content,
            snippet,
        })
        .await?;
    info!("Saved story {}", story.id);

    Ok((StatusCode::CREATED, Json(StoryCreatedResponse { story })))
}

/// Delete one story owned by the user.
#[utoipa::path(
    delete,
    path = "/api/stories/{id}",
    params(
        ("id" = String, Path, description = "The story id."),
        ("userId" = String, Query, description = "The id of the story owner.")
    ),
    responses(
        (status = 204, description = "Story deleted"),
        (status = 400, description = "userId missing"),
        (status = 404, description = "No story with this id for this user"),
        (status = 503, description = "Story store not connected")
    )
)]
pub async fn delete_story_handler(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user_id(query.user_id, None)?;
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("id is required".to_string()));
    }
    store.delete_story(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every story of the user.
#[utoipa::path(
    delete,
    path = "/api/stories",
    params(
        ("userId" = String, Query, description = "The id of the story owner.")
    ),
    responses(
        (status = 204, description = "History cleared"),
        (status = 400, description = "userId missing"),
        (status = 503, description = "Story store not connected")
    )
)]
pub async fn clear_stories_handler(
    Extension(StoreHandle(store)): Extension<StoreHandle>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user_id(query.user_id, None)?;
    store.clear_stories(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
