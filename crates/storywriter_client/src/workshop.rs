//! crates/storywriter_client/src/workshop.rs
//!
//! Story drafting and the chat refinement session built on the generation
//! client and the history synchronizer.

use crate::{
    error::ClientError,
    generation::GenerationClient,
    history_sync::{HistorySynchronizer, SyncTask},
};
use std::sync::Arc;
use storywriter_core::{
    compose_story,
    domain::{ChatTurn, StoryGenerationRequest, StoryHistoryItem, StoryOptions},
};
use tracing::{info, warn};

/// Characters of the story quoted in the chat opener.
const CONTEXT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Remote,
    Fallback,
}

/// A finished draft and the background save of its history entry.
#[derive(Debug)]
pub struct GeneratedDraft {
    pub content: String,
    /// Only set when the backend produced the draft.
    pub title: Option<String>,
    pub source: DraftSource,
    /// The entry as first recorded, with its local id.
    pub item: StoryHistoryItem,
    pub sync: SyncTask<StoryHistoryItem>,
}

pub struct StoryWorkshop {
    client: Arc<GenerationClient>,
    history: HistorySynchronizer,
}

impl StoryWorkshop {
    pub fn new(client: Arc<GenerationClient>, history: HistorySynchronizer) -> Self {
        Self { client, history }
    }

    /// Produces a draft for `options`, remotely when possible and from the
    /// local composer otherwise, and records it in the history.
    pub async fn generate(&self, options: &StoryOptions) -> GeneratedDraft {
        let request = StoryGenerationRequest::from_options(options);
        let (content, title, source) = match self.client.generate_story(request).await {
            Ok(response) => (response.story, response.title, DraftSource::Remote),
            Err(e) => {
                warn!("Remote generation failed, composing locally: {}", e);
                let content = format!(
                    "{}\n\n[Fallback mode] AI backend unavailable: {}",
                    compose_story(options),
                    e
                );
                (content, None, DraftSource::Fallback)
            }
        };

        let (item, sync) = self.history.record(options.clone(), content.clone());
        info!("Recorded {:?} draft {}", source, item.id);
        GeneratedDraft {
            content,
            title,
            source,
            item,
            sync,
        }
    }

    /// Returns the stored options and content of a history entry.
    pub fn load_history_item(&self, id: &str) -> Option<(StoryOptions, String)> {
        self.history
            .find(id)
            .map(|item| (item.options, item.content))
    }

    pub fn history(&self) -> &HistorySynchronizer {
        &self.history
    }

    pub fn client(&self) -> &Arc<GenerationClient> {
        &self.client
    }
}

//=========================================================================================
// Chat
//=========================================================================================

fn opening_message(story: &str) -> String {
    let preview: String = story.chars().take(CONTEXT_PREVIEW_CHARS).collect();
    format!(
        "I'm your story writing assistant! I can help you refine, expand, or modify your story. Here's what we're working with:\n\n{}...\n\nWhat would you like to do next?",
        preview
    )
}

/// A conversation about one story.
pub struct ChatSession {
    client: Arc<GenerationClient>,
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self {
            client,
            turns: Vec::new(),
        }
    }

    /// Starts with an assistant message quoting the beginning of `story`.
    /// An empty story starts an empty conversation.
    pub fn with_story_context(client: Arc<GenerationClient>, story: &str) -> Self {
        let mut session = Self::new(client);
        if !story.trim().is_empty() {
            session.turns.push(ChatTurn::assistant(opening_message(story)));
        }
        session
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Sends `input` with the prior turns and appends the reply.
    ///
    /// On failure the user turn is withdrawn so the conversation is unchanged.
    pub async fn send(&mut self, input: &str) -> Result<String, ClientError> {
        let message = input.trim();
        if message.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let prior = self.turns.clone();
        self.turns.push(ChatTurn::user(message));
        match self.client.send_chat_message(message, &prior).await {
            Ok(reply) => {
                self.turns.push(ChatTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.turns.pop();
                Err(e)
            }
        }
    }
}
