use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, types::Uuid};

use storyloom_common::{url_safe_id, SESSION_ID_LEN};
use storyloom_database::{SqlxCrud, SqlxSchema};

// The `NOT .. ANY` guard keeps concurrent first views from appending the same
// principal twice.
const APPEND_PARTICIPANT_SQL: &str = r#"UPDATE "sessions" SET participants = array_append(participants, $1) WHERE id = $2 AND NOT ($1 = ANY(participants))"#;

/// A collaborative story thread.
///
/// `participants` is stored as an ordered list but treated as a set: it only grows, and
/// never holds the same principal twice. The creator is always a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub is_complete: bool,
    pub participants: Vec<Uuid>,
}

impl Session {
    pub fn new(creator: Uuid, title: &str) -> Self {
        Self {
            id: url_safe_id(SESSION_ID_LEN),
            title: title.to_string(),
            created_at: Utc::now(),
            created_by: creator,
            is_complete: false,
            participants: vec![creator],
        }
    }

    pub fn is_participant(&self, principal: &Uuid) -> bool {
        self.created_by == *principal || self.participants.contains(principal)
    }

    /// Adds `principal` unless already present. Returns whether the list changed.
    pub fn join(&mut self, principal: Uuid) -> bool {
        if self.participants.contains(&principal) {
            return false;
        }
        self.participants.push(principal);
        true
    }

    /// Atomically appends `principal` to the stored participant list unless it is
    /// already there. Safe to run twice for the same principal.
    pub async fn append_participant<'e, Exe>(
        session_id: &str,
        principal: &Uuid,
        executor: Exe,
    ) -> Result<bool, sqlx::Error>
    where
        Exe: sqlx::Executor<'e, Database = Postgres> + Send,
    {
        let result = sqlx::query(APPEND_PARTICIPANT_SQL)
        .bind(principal)
        .bind(session_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flips `is_complete` for a session owned by `owner`. Returns false when no row
    /// matched, i.e. the session is missing or owned by someone else.
    pub async fn mark_complete<'e, Exe>(
        session_id: &str,
        owner: &Uuid,
        executor: Exe,
    ) -> Result<bool, sqlx::Error>
    where
        Exe: sqlx::Executor<'e, Database = Postgres> + Send,
    {
        let result = sqlx::query(
            r#"UPDATE "sessions" SET is_complete = TRUE WHERE id = $1 AND created_by = $2"#,
        )
        .bind(session_id)
        .bind(owner)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl SqlxSchema for Session {
    type Id = String;
    type Row = Session;

    const TABLE_NAME: &'static str = "sessions";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id", "title", "created_at", "created_by", "is_complete", "participants",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        r#"CREATE INDEX IF NOT EXISTS "idx_sessions_created_by" ON "sessions" ("created_by")"#,
        r#"CREATE INDEX IF NOT EXISTS "idx_sessions_participants" ON "sessions" USING GIN ("participants")"#,
    ];

    fn from_row(row: Self::Row) -> Self { row }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "sessions" (
            "id" TEXT PRIMARY KEY,
            "title" TEXT NOT NULL,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "created_by" UUID NOT NULL,
            "is_complete" BOOLEAN NOT NULL DEFAULT FALSE,
            "participants" UUID[] NOT NULL DEFAULT '{}'
        )"#.to_string()
    }
}

impl SqlxCrud for Session {
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, sqlx::postgres::PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, sqlx::postgres::PgArguments>
    {
        query
            .bind(self.id.clone())
            .bind(self.title.clone())
            .bind(self.created_at)
            .bind(self.created_by)
            .bind(self.is_complete)
            .bind(self.participants.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_lists_creator_once() {
        let creator = Uuid::new_v4();
        let mut session = Session::new(creator, "A door appears");

        assert_eq!(session.participants, vec![creator]);
        assert!(!session.is_complete);
        assert!(!session.join(creator));
        assert_eq!(session.participants.len(), 1);
    }

    #[test]
    fn join_is_idempotent() {
        let mut session = Session::new(Uuid::new_v4(), "t");
        let guest = Uuid::new_v4();

        assert!(session.join(guest));
        assert!(!session.join(guest));
        assert_eq!(session.participants.iter().filter(|p| **p == guest).count(), 1);
        assert!(session.is_participant(&guest));
    }

    #[test]
    fn participant_append_is_guarded() {
        assert!(APPEND_PARTICIPANT_SQL.contains("array_append(participants, $1)"));
        assert!(APPEND_PARTICIPANT_SQL.ends_with("WHERE id = $2 AND NOT ($1 = ANY(participants))"));
    }

    #[test]
    fn insert_sql_binds_every_column() {
        assert_eq!(
            Session::insert_sql(),
            "INSERT INTO \"sessions\" (\"id\", \"title\", \"created_at\", \"created_by\", \"is_complete\", \"participants\") \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING \"id\", \"title\", \"created_at\", \"created_by\", \"is_complete\", \"participants\""
        );
    }
}
