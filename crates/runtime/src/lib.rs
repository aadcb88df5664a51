mod access;
mod env;
mod error;
mod generator;
mod identity;
mod image;
mod llm;
mod repository;
mod runtime;
mod session;
mod store;
mod story_part;
mod view;

pub use access::{can_read, can_write, decide_read, is_owner, JoinPolicy, ReadDecision};
pub use env::RuntimeEnv;
pub use error::{AccessError, StoryError};
pub use generator::{
    parse_numbered_list, GenerationMode, StoryBackend, StoryGenerator, TextRequest, FALLBACK_TOPICS,
};
pub use identity::{AuthContext, IdentityProvider, Principal, SealedTokenProvider, TokenClaims};
pub use image::{story_image_key, ImageStore};
pub use llm::OpenAiStoryBackend;
pub use repository::SessionRepository;
pub use runtime::StoryRuntime;
pub use session::Session;
pub use store::{MemoryStoryStore, PgStoryStore, StoryStore};
pub use story_part::{PartType, StoryPart, StoryPath};
pub use view::{CompletedStory, CurrentUser, SessionSummary, SessionView};
