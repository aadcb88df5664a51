use anyhow::Result;
use sqlx::types::Uuid;

use storyloom_clients::PostgresClient;
use storyloom_common::ModuleClient;
use storyloom_database::{
    condition, FilterKind, OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery,
};

use super::StoryStore;
use crate::{Session, StoryPart};

#[derive(Clone)]
pub struct PgStoryStore {
    db: PostgresClient,
}

impl PgStoryStore {
    pub fn new(db: PostgresClient) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl StoryStore for PgStoryStore {
    async fn insert_session_with_seed(&self, session: &Session, seed: &StoryPart) -> Result<()> {
        let mut tx = self.db.get_client().begin().await?;
        session.clone().create(&mut *tx).await?;
        seed.clone().create(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        let pool = self.db.get_client();
        Ok(Session::find_by_id(session_id.to_string(), &**pool).await?)
    }

    async fn add_participant(&self, session_id: &str, principal: Uuid) -> Result<bool> {
        let pool = self.db.get_client();
        Ok(Session::append_participant(session_id, &principal, &**pool).await?)
    }

    async fn insert_part(&self, part: &StoryPart) -> Result<bool> {
        let pool = self.db.get_client();
        Ok(part.insert_if_open(&**pool).await?)
    }

    async fn list_parts(&self, session_id: &str) -> Result<Vec<StoryPart>> {
        let pool = self.db.get_client();
        let parts = StoryPart::find_by_criteria(
            StoryPart::in_story_order(
                QueryCriteria::new().add_valued_filter("session_id", "=", session_id.to_string()),
            ),
            &**pool,
        ).await?;
        Ok(parts)
    }

    async fn list_parts_for(&self, session_ids: &[String]) -> Result<Vec<StoryPart>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        let pool = self.db.get_client();
        let parts = StoryPart::find_by_criteria(
            StoryPart::in_story_order(
                QueryCriteria::new().add_in_list("session_id", session_ids.to_vec()),
            ),
            &**pool,
        ).await?;
        Ok(parts)
    }

    async fn sessions_for(&self, principal: Uuid) -> Result<Vec<Session>> {
        let pool = self.db.get_client();
        let sessions = Session::find_by_criteria(
            QueryCriteria::new()
                .add_any_of(vec![
                    condition("created_by", FilterKind::Compare("="), principal),
                    condition("participants", FilterKind::ArrayContains, principal),
                ])
                .order_by("created_at", OrderDirection::Desc),
            &**pool,
        ).await?;
        Ok(sessions)
    }

    async fn completed_sessions(&self) -> Result<Vec<Session>> {
        let pool = self.db.get_client();
        let sessions = Session::find_by_criteria(
            QueryCriteria::new()
                .add_valued_filter("is_complete", "=", true)
                .order_by("created_at", OrderDirection::Desc),
            &**pool,
        ).await?;
        Ok(sessions)
    }

    async fn mark_complete(&self, session_id: &str, owner: Uuid) -> Result<bool> {
        let pool = self.db.get_client();
        Ok(Session::mark_complete(session_id, &owner, &**pool).await?)
    }
}
