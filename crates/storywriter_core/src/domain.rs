//! crates/storywriter_core/src/domain.rs
//!
//! Defines the core data structures shared by the proxy service and the client.
//! These types are the JSON wire shapes as well, so field names follow the
//! camelCase convention the browser frontend already speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of characters kept in a history snippet before the ellipsis.
pub const SNIPPET_MAX_CHARS: usize = 120;

//=========================================================================================
// Story Options
//=========================================================================================

/// The three supported story sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Number of paragraphs the offline composer produces.
    pub fn paragraph_count(self) -> usize {
        match self {
            Self::Short => 3,
            Self::Medium => 5,
            Self::Long => 7,
        }
    }

    /// Completion budget requested from the upstream model.
    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Short => 500,
            Self::Medium => 1500,
            Self::Long => 3000,
        }
    }
}

impl fmt::Display for StoryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the user filled into the story form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct StoryOptions {
    pub title: String,
    pub premise: String,
    pub genre: String,
    pub tone: String,
    pub audience: String,
    pub length: StoryLength,
    pub point_of_view: String,
    pub include_twist: bool,
    pub include_dialogue: bool,
}

impl Default for StoryOptions {
    fn default() -> Self {
        Self {
            title: "The Last Lantern Keeper".to_string(),
            premise: "An apprentice discovers that the city lights hide messages from forgotten travelers."
                .to_string(),
            genre: GENRE_OPTIONS[0].to_string(),
            tone: TONE_OPTIONS[0].to_string(),
            audience: AUDIENCE_OPTIONS[2].to_string(),
            length: StoryLength::Medium,
            point_of_view: POINT_OF_VIEW_OPTIONS[1].to_string(),
            include_twist: true,
            include_dialogue: true,
        }
    }
}

pub const GENRE_OPTIONS: [&str; 6] = [
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Romance",
    "Thriller",
    "Historical Fiction",
];

pub const TONE_OPTIONS: [&str; 6] = [
    "Hopeful",
    "Dark",
    "Whimsical",
    "Epic",
    "Suspenseful",
    "Heartwarming",
];

pub const AUDIENCE_OPTIONS: [&str; 4] = ["Kids", "Teens", "Young Adults", "Adults"];

pub const POINT_OF_VIEW_OPTIONS: [&str; 3] = [
    "First Person",
    "Third Person Limited",
    "Third Person Omniscient",
];

/// A canned starting point offered next to the story form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
    pub suggested_tone: &'static str,
}

/// The built-in story templates. No network call is involved.
pub fn story_templates() -> Vec<StoryTemplate> {
    vec![
        StoryTemplate {
            id: "fantasy-quest",
            name: "Fantasy Quest",
            prompt: "A hero embarks on an epic journey to save their kingdom...",
            suggested_tone: "adventurous",
        },
        StoryTemplate {
            id: "sci-fi-future",
            name: "Sci-Fi Future",
            prompt: "In a distant future, a mysterious discovery changes everything...",
            suggested_tone: "mysterious",
        },
        StoryTemplate {
            id: "romance-tale",
            name: "Romance Tale",
            prompt: "Two souls meet under unexpected circumstances...",
            suggested_tone: "romantic",
        },
        StoryTemplate {
            id: "mystery-thriller",
            name: "Mystery Thriller",
            prompt: "A detective arrives at a crime scene with no clear suspects...",
            suggested_tone: "suspenseful",
        },
        StoryTemplate {
            id: "short-poetry",
            name: "Poetry Collection",
            prompt: "Create a series of interconnected poems about...",
            suggested_tone: "lyrical",
        },
    ]
}

//=========================================================================================
// Story History
//=========================================================================================

/// A generated story as kept in the user's history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct StoryHistoryItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub options: StoryOptions,
    pub content: String,
    pub snippet: String,
}

impl StoryHistoryItem {
    /// Builds a local-only entry with a fresh client-side id.
    pub fn new_local(options: StoryOptions, content: String) -> Self {
        let snippet = to_snippet(&content);
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            options,
            content,
            snippet,
        }
    }
}

/// The payload persisted to the backend history collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStoryRecord {
    pub user_id: String,
    pub options: StoryOptions,
    pub content: String,
    pub snippet: String,
}

/// Collapses whitespace and truncates to a short preview.
pub fn to_snippet(content: &str) -> String {
    let condensed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if condensed.chars().count() > SNIPPET_MAX_CHARS {
        let head: String = condensed.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        condensed
    }
}

//=========================================================================================
// Generation and Chat
//=========================================================================================

/// The body of `POST /api/stories/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct StoryGenerationRequest {
    pub prompt: String,
    pub genre: String,
    pub tone: String,
    pub length: StoryLength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<String>>,
}

impl StoryGenerationRequest {
    /// Derives the upstream request from the story form.
    pub fn from_options(options: &StoryOptions) -> Self {
        Self {
            prompt: options.premise.clone(),
            genre: options.genre.clone(),
            tone: options.tone.clone(),
            length: options.length,
            themes: options
                .include_twist
                .then(|| vec!["plot twist".to_string()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct StoryMetadata {
    /// Rough token estimate (characters / 4).
    pub tokens: u64,
    pub generated_at: DateTime<Utc>,
}

/// The body returned by `POST /api/stories/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct StoryGenerationResponse {
    pub story: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StoryMetadata>,
}

/// A story as produced by the upstream model, split into title and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStory {
    pub title: String,
    pub story: String,
    /// Length of the raw completion in characters.
    pub raw_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of a refinement conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

//=========================================================================================
// Authentication (client-local)
//=========================================================================================

/// The logged-in user, trusted for as long as it exists in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub logged_in_at: DateTime<Utc>,
}

/// A locally registered account. `email` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn to_session(&self) -> AuthSession {
        AuthSession {
            user_id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            logged_in_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_collapses_whitespace() {
        assert_eq!(to_snippet("  once\n\nupon \t a   time "), "once upon a time");
    }

    #[test]
    fn snippet_truncates_long_content() {
        let content = "word ".repeat(60);
        let snippet = to_snippet(&content);
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS + 3);
    }

    #[test]
    fn snippet_keeps_exactly_max_length() {
        let content = "a".repeat(SNIPPET_MAX_CHARS);
        assert_eq!(to_snippet(&content), content);
    }

    #[test]
    fn options_use_camel_case_on_the_wire() {
        let json = serde_json::to_value(StoryOptions::default()).unwrap();
        assert_eq!(json["pointOfView"], "Third Person Limited");
        assert_eq!(json["includeTwist"], true);
        assert_eq!(json["length"], "medium");
    }

    #[test]
    fn unknown_length_is_rejected() {
        let result = serde_json::from_str::<StoryLength>("\"epic\"");
        assert!(result.is_err());
    }

    #[test]
    fn request_adds_twist_theme_only_when_requested() {
        let mut options = StoryOptions::default();
        let request = StoryGenerationRequest::from_options(&options);
        assert_eq!(request.themes, Some(vec!["plot twist".to_string()]));
        assert_eq!(request.prompt, options.premise);

        options.include_twist = false;
        let request = StoryGenerationRequest::from_options(&options);
        assert_eq!(request.themes, None);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("themes").is_none());
    }

    #[test]
    fn history_item_round_trips_created_at() {
        let item = StoryHistoryItem::new_local(StoryOptions::default(), "Hello".to_string());
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"createdAt\""));
        let back: StoryHistoryItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
