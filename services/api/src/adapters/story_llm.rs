//! services/api/src/adapters/story_llm.rs
//!
//! This module contains the adapter for the hosted chat-completion model.
//! It implements the `StoryModelService` port from the `core` crate and injects
//! the server-held API key into every upstream call.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use storywriter_core::{
    domain::{ChatTurn, GeneratedStory, StoryGenerationRequest},
    ports::{PortError, PortResult, StoryModelService},
};
use tracing::{error, info};

const CHAT_SYSTEM_INSTRUCTIONS: &str = "You are a helpful story writing assistant. Help users refine, expand, or modify their stories. Be creative and supportive.";

const STORY_TEMPERATURE: f32 = 0.85;
const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 800;

pub const UNTITLED_STORY: &str = "Untitled Story";
pub const EMPTY_CHAT_REPLY: &str = "No response received";

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*").expect("heading pattern is valid"));

//=========================================================================================
// Upstream Wire Types
//=========================================================================================

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionChoiceMessage,
}

#[derive(Deserialize)]
struct CompletionChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `StoryModelService` against an OpenAI-compatible
/// `/chat/completions` endpoint.
#[derive(Clone)]
pub struct UpstreamStoryAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl UpstreamStoryAdapter {
    /// Creates a new `UpstreamStoryAdapter`. Without an API key every call
    /// fails with `PortError::NotConfigured`.
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    /// Sends one completion request and returns the first choice's text.
    async fn complete(
        &self,
        messages: Vec<CompletionMessage<'_>>,
        temperature: f32,
        max_tokens: u32,
    ) -> PortResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PortError::NotConfigured("ASI1_API_KEY not configured on backend".to_string())
        })?;

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Upstream model API error ({}): {}", status, body);
            return Err(PortError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion = response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid upstream response: {}", e)))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Builds the system prompt for a story request.
fn story_instructions(request: &StoryGenerationRequest) -> String {
    let themes = match request.themes.as_deref() {
        Some(themes) if !themes.is_empty() => {
            format!(" Include these themes: {}", themes.join(", "))
        }
        _ => String::new(),
    };
    format!(
        "You are a creative story writer. Generate a {} story in {} genre with a {} tone.{} Format: Start with a compelling title on the first line, then the story.",
        request.length, request.genre, request.tone, themes
    )
}

/// Splits a completion into a title (first line, heading markers removed) and
/// the remaining story text.
pub fn split_title(content: &str) -> (String, String) {
    let mut lines = content.split('\n');
    let first = lines.next().unwrap_or_default();
    let title = HEADING_MARKER.replace(first, "").into_owned();
    let title = if title.is_empty() {
        UNTITLED_STORY.to_string()
    } else {
        title
    };
    let story = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (title, story)
}

//=========================================================================================
// `StoryModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryModelService for UpstreamStoryAdapter {
    async fn generate_story(&self, request: &StoryGenerationRequest) -> PortResult<GeneratedStory> {
        info!(
            "Generating story: \"{}\" ({}/{}/{})",
            request.prompt, request.genre, request.tone, request.length
        );

        let instructions = story_instructions(request);
        let prompt = format!("Story prompt: {}", request.prompt);
        let messages = vec![
            CompletionMessage {
                role: "system",
                content: &instructions,
            },
            CompletionMessage {
                role: "user",
                content: &prompt,
            },
        ];

        let content = self
            .complete(messages, STORY_TEMPERATURE, request.length.max_tokens())
            .await?;
        let (title, story) = split_title(&content);
        info!("Story generated: \"{}\"", title);

        Ok(GeneratedStory {
            title,
            story,
            raw_chars: content.chars().count(),
        })
    }

    async fn chat(&self, messages: &[ChatTurn]) -> PortResult<String> {
        info!("Chat request with {} messages", messages.len());

        let history = messages.iter().map(|turn| CompletionMessage {
            role: match turn.role {
                storywriter_core::ChatRole::User => "user",
                storywriter_core::ChatRole::Assistant => "assistant",
            },
            content: &turn.content,
        });
        let request_messages = std::iter::once(CompletionMessage {
            role: "system",
            content: CHAT_SYSTEM_INSTRUCTIONS,
        })
        .chain(history)
        .collect();

        let content = self
            .complete(request_messages, CHAT_TEMPERATURE, CHAT_MAX_TOKENS)
            .await?;
        if content.is_empty() {
            return Ok(EMPTY_CHAT_REPLY.to_string());
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use storywriter_core::StoryLength;

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Serves `/chat/completions` with a fixed status and body, recording requests.
    async fn spawn_upstream(status: StatusCode, body: Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/chat/completions",
                post(
                    move |State(captured): State<Captured>,
                          headers: axum::http::HeaderMap,
                          Json(request): Json<Value>| {
                        let body = body.clone();
                        async move {
                            let auth = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            captured.lock().unwrap().push((auth, request));
                            (status, Json(body))
                        }
                    },
                ),
            )
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    fn adapter(base_url: String, api_key: Option<&str>) -> UpstreamStoryAdapter {
        UpstreamStoryAdapter::new(
            reqwest::Client::new(),
            base_url,
            api_key.map(str::to_string),
            "asi1".to_string(),
        )
    }

    fn request() -> StoryGenerationRequest {
        StoryGenerationRequest {
            prompt: "A lighthouse that sings".to_string(),
            genre: "Fantasy".to_string(),
            tone: "Hopeful".to_string(),
            length: StoryLength::Short,
            themes: Some(vec!["plot twist".to_string()]),
        }
    }

    #[test]
    fn title_heading_markers_are_removed() {
        let (title, story) = split_title("## The Singing Light\n\nOnce upon a tide.\nThe end.");
        assert_eq!(title, "The Singing Light");
        assert_eq!(story, "Once upon a tide.\nThe end.");
    }

    #[test]
    fn empty_first_line_falls_back_to_untitled() {
        let (title, story) = split_title("\nJust a story.");
        assert_eq!(title, UNTITLED_STORY);
        assert_eq!(story, "Just a story.");
    }

    #[test]
    fn title_keeps_text_after_the_heading_marker_verbatim() {
        let (title, _) = split_title("#   Tide Song  \nBody");
        assert_eq!(title, "Tide Song  ");

        // Only a leading marker run is removed; a blank line is still a title.
        let (title, story) = split_title("   \nBody");
        assert_eq!(title, "   ");
        assert_eq!(story, "Body");

        let (title, _) = split_title("###\nBody");
        assert_eq!(title, UNTITLED_STORY);
    }

    #[test]
    fn instructions_mention_length_and_themes() {
        let text = story_instructions(&request());
        assert!(text.contains("Generate a short story in Fantasy genre with a Hopeful tone."));
        assert!(text.contains("Include these themes: plot twist"));

        let mut no_themes = request();
        no_themes.themes = None;
        assert!(!story_instructions(&no_themes).contains("Include these themes"));
    }

    #[tokio::test]
    async fn generate_injects_key_and_budget() {
        let (base_url, captured) = spawn_upstream(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": "# Title\nBody text"}}]}),
        )
        .await;
        let story = adapter(base_url, Some("secret"))
            .generate_story(&request())
            .await
            .unwrap();

        assert_eq!(story.title, "Title");
        assert_eq!(story.story, "Body text");
        assert_eq!(story.raw_chars, "# Title\nBody text".len());

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("Bearer secret"));
        assert_eq!(calls[0].1["max_tokens"], 500);
        assert_eq!(calls[0].1["model"], "asi1");
        assert_eq!(calls[0].1["messages"][1]["content"], "Story prompt: A lighthouse that sings");
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status_and_body() {
        let (base_url, _) =
            spawn_upstream(StatusCode::TOO_MANY_REQUESTS, json!({"error": "quota"})).await;
        let err = adapter(base_url, Some("secret"))
            .generate_story(&request())
            .await
            .unwrap_err();
        match err {
            PortError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("quota"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_never_calls_upstream() {
        let (base_url, captured) = spawn_upstream(StatusCode::OK, json!({})).await;
        let err = adapter(base_url, None).chat(&[]).await.unwrap_err();
        assert!(matches!(err, PortError::NotConfigured(_)));
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_prepends_system_instruction() {
        let (base_url, captured) = spawn_upstream(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": ""}}]}),
        )
        .await;
        let reply = adapter(base_url, Some("secret"))
            .chat(&[ChatTurn::user("Make it darker")])
            .await
            .unwrap();

        assert_eq!(reply, EMPTY_CHAT_REPLY);
        let calls = captured.lock().unwrap();
        let messages = calls[0].1["messages"].as_array().unwrap().clone();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], CHAT_SYSTEM_INSTRUCTIONS);
        assert_eq!(messages[1]["content"], "Make it darker");
        assert_eq!(calls[0].1["max_tokens"], 800);
    }
}
