mod memory;
mod postgres;

pub use memory::MemoryStoryStore;
pub use postgres::PgStoryStore;

use anyhow::Result;
use sqlx::types::Uuid;

use crate::{Session, StoryPart};

/// Row storage for sessions and their parts.
///
/// Implementations do no authorization; that is the repository's job.
#[async_trait::async_trait]
pub trait StoryStore: Send + Sync {
    /// Inserts a session together with its seed part. Either both rows become visible
    /// or neither does.
    async fn insert_session_with_seed(&self, session: &Session, seed: &StoryPart) -> Result<()>;

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Appends `principal` to the participant set. Returns false when it was already
    /// present or the session does not exist. Never produces duplicates.
    async fn add_participant(&self, session_id: &str, principal: Uuid) -> Result<bool>;

    /// Inserts `part` only while its session exists and is not complete, checked
    /// atomically with the insert. Returns false when nothing was written.
    async fn insert_part(&self, part: &StoryPart) -> Result<bool>;

    /// Parts of one session, ascending by timestamp, ties in insertion order.
    async fn list_parts(&self, session_id: &str) -> Result<Vec<StoryPart>>;

    /// Parts of several sessions, ascending by timestamp, ties in insertion order.
    async fn list_parts_for(&self, session_ids: &[String]) -> Result<Vec<StoryPart>>;

    /// Sessions `principal` created or participates in.
    async fn sessions_for(&self, principal: Uuid) -> Result<Vec<Session>>;

    /// Completed sessions, newest first.
    async fn completed_sessions(&self) -> Result<Vec<Session>>;

    /// Sets `is_complete` when `owner` created the session. Returns whether a row matched.
    async fn mark_complete(&self, session_id: &str, owner: Uuid) -> Result<bool>;
}
