pub mod db;
pub mod story_llm;

pub use db::DbAdapter;
pub use story_llm::UpstreamStoryAdapter;
