pub mod generation;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use generation::{chat_handler, generate_story_handler};
pub use middleware::require_store;
pub use rest::{
    clear_stories_handler, create_story_handler, delete_story_handler, health_handler,
    list_stories_handler,
};

use rest::ApiDoc;
use state::AppState;

/// Builds the CORS layer: one configured origin, or any origin when unset.
fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    match allow_origin.map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => base.allow_origin(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid CORS_ALLOW_ORIGIN: {}", e);
            base.allow_origin(Any)
        }
        None => base.allow_origin(Any),
    }
}

/// Creates the complete web application: proxy routes, history routes and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Routes that relay to the upstream model
    let generation_routes = Router::new()
        .route("/api/stories/generate", post(generate_story_handler))
        .route("/api/chat", post(chat_handler));

    // History routes (document store required)
    let history_routes = Router::new()
        .route(
            "/api/stories",
            get(list_stories_handler)
                .post(create_story_handler)
                .delete(clear_stories_handler),
        )
        .route("/api/stories/{id}", delete(delete_story_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_store,
        ));

    let cors = cors_layer(app_state.config.cors_allow_origin.as_deref());

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .merge(generation_routes)
        .merge(history_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
