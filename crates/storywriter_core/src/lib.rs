pub mod composer;
pub mod domain;
pub mod ports;

pub use composer::compose_story;
pub use domain::{
    story_templates, to_snippet, AuthSession, AuthUser, ChatRole, ChatTurn, GeneratedStory,
    NewStoryRecord, StoryGenerationRequest, StoryGenerationResponse, StoryHistoryItem,
    StoryLength, StoryMetadata, StoryOptions, StoryTemplate,
};
pub use ports::{PortError, PortResult, StoryHistoryRemote, StoryModelService, StoryStore};
