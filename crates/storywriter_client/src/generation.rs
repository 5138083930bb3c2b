//! crates/storywriter_client/src/generation.rs
//!
//! Remote generation client. Every story and chat call goes through one
//! `RequestQueue`, and every dispatched call is bounded by a timeout with a
//! single retry for network-class failures.

use crate::{config::ClientSettings, error::ClientError, queue::RequestQueue};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use storywriter_core::domain::{ChatTurn, StoryGenerationRequest, StoryGenerationResponse};
use tracing::{debug, error, warn};

pub const EMPTY_CHAT_REPLY: &str = "No response received";

#[derive(Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

#[derive(Serialize)]
struct ChatPayload {
    messages: Vec<ChatTurn>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Why a single attempt failed.
enum AttemptError {
    /// Worth another try: timeouts, refused connections, broken transports.
    Transient(String),
    Fatal(ClientError),
}

fn classify(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        AttemptError::Transient(e.to_string())
    } else if e.is_decode() {
        AttemptError::Fatal(ClientError::Decode(e.to_string()))
    } else {
        AttemptError::Fatal(ClientError::InvalidRequest(e.to_string()))
    }
}

/// Performs the HTTP calls; shared by the queued jobs.
struct HttpCaller {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpCaller {
    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("API call: POST {}", url);

        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, self.attempt(&url, body)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AttemptError::Transient(format!(
                    "no response within {:?}",
                    self.timeout
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => {
                    error!("API call to {} failed: {}", url, e);
                    return Err(e);
                }
                Err(AttemptError::Transient(reason)) => {
                    warn!("Attempt {} to {} failed: {}", attempt + 1, url, reason);
                    if attempt < self.max_retries {
                        attempt += 1;
                        tokio::time::sleep(self.retry_backoff).await;
                        continue;
                    }
                    return Err(ClientError::Unreachable);
                }
            }
        }
    }

    async fn attempt<B, R>(&self, url: &str, body: &B) -> Result<R, AttemptError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        debug!("Response status: {}", status);
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorPayload>(&text)
                .ok()
                .and_then(|payload| payload.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            return Err(AttemptError::Fatal(ClientError::Status {
                status: status.as_u16(),
                message,
            }));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AttemptError::Fatal(ClientError::Decode(e.to_string())))
    }
}

/// Client for the proxy's generation and chat endpoints.
///
/// Construct one per application and share it; each instance owns its queue.
pub struct GenerationClient {
    caller: Arc<HttpCaller>,
    queue: RequestQueue,
}

impl GenerationClient {
    /// Creates the client and starts its queue worker. Must be called inside a
    /// Tokio runtime.
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_http_client(http, settings))
    }

    pub fn with_http_client(http: reqwest::Client, settings: &ClientSettings) -> Self {
        debug!("Generation client using proxy {}", settings.proxy_url);
        Self {
            caller: Arc::new(HttpCaller {
                http,
                base_url: settings.proxy_url.trim_end_matches('/').to_string(),
                timeout: settings.request_timeout,
                max_retries: settings.max_retries,
                retry_backoff: settings.retry_backoff,
            }),
            queue: RequestQueue::new(settings.rate_limit_delay),
        }
    }

    /// Generates a story through the proxy.
    pub async fn generate_story(
        &self,
        request: StoryGenerationRequest,
    ) -> Result<StoryGenerationResponse, ClientError> {
        let caller = self.caller.clone();
        self.queue
            .submit(async move {
                caller
                    .post_json::<_, StoryGenerationResponse>("/api/stories/generate", &request)
                    .await
            })
            .await
    }

    /// Sends `message` after `history` and returns the assistant reply.
    pub async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<String, ClientError> {
        let mut messages = history.to_vec();
        messages.push(ChatTurn::user(message));
        let payload = ChatPayload { messages };

        let caller = self.caller.clone();
        let reply = self
            .queue
            .submit(async move { caller.post_json::<_, ChatReply>("/api/chat", &payload).await })
            .await?;

        if reply.content.is_empty() {
            Ok(EMPTY_CHAT_REPLY.to_string())
        } else {
            Ok(reply.content)
        }
    }

    /// Returns true when the proxy answers its health check. Not queued.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.caller.base_url);
        match self
            .caller
            .http
            .get(url)
            .timeout(self.caller.timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}
