use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use storyloom_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PartType {
    #[default]
    Text,
    Image,
}

impl std::fmt::Display for PartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartType::Text => write!(f, "text"),
            PartType::Image => write!(f, "image"),
        }
    }
}

impl std::str::FromStr for PartType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(PartType::Text),
            "image" => Ok(PartType::Image),
            other => Err(anyhow::anyhow!("unknown story part type: {}", other)),
        }
    }
}

/// One persisted, append-only contribution to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoryPart {
    pub id: Uuid,
    pub session_id: String,
    pub content: String,
    pub author_id: Uuid,
    /// Display name at write time. Not updated if the author later renames.
    pub author_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub part_type: PartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl StoryPart {
    pub fn new(
        session_id: &str,
        content: &str,
        author_id: Uuid,
        author_name: &str,
        part_type: PartType,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            content: content.to_string(),
            author_id,
            author_name: author_name.to_string(),
            timestamp: Utc::now(),
            part_type,
            image_url,
        }
    }
}

impl StoryPart {
    /// Insert that only lands while the owning session is open. The session row is held
    /// `FOR SHARE` so a concurrent completion waits for this statement instead of
    /// slipping in between the check and the write.
    pub fn insert_if_open_sql() -> String {
        let placeholders = (1..=Self::COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO \"{table}\" ({columns}) SELECT {placeholders} \
             WHERE EXISTS (SELECT 1 FROM \"sessions\" WHERE \"id\" = $2 AND NOT \"is_complete\" FOR SHARE) \
             RETURNING {columns}",
            table = Self::TABLE_NAME,
            columns = Self::column_list(),
        )
    }

    /// Returns false when the session is missing or already complete.
    pub async fn insert_if_open<'e, Exe>(&self, executor: Exe) -> Result<bool, sqlx::Error>
    where
        Exe: sqlx::Executor<'e, Database = sqlx::Postgres> + Send,
    {
        let sql = Self::insert_if_open_sql();
        let row = self
            .bind_insert(sqlx::query_as::<_, Self>(&sql))
            .fetch_optional(executor)
            .await?;
        Ok(row.is_some())
    }

    /// Timestamp order with `seq`, the insertion counter, breaking ties.
    pub fn in_story_order(criteria: QueryCriteria) -> QueryCriteria {
        criteria
            .order_by("timestamp", OrderDirection::Asc)
            .order_by("seq", OrderDirection::Asc)
    }
}

impl SqlxSchema for StoryPart {
    type Id = Uuid;
    type Row = StoryPart;

    const TABLE_NAME: &'static str = "story_parts";
    const ID_COLUMN_NAME: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id", "session_id", "content", "author_id", "author_name", "timestamp", "type", "image_url",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        r#"CREATE INDEX IF NOT EXISTS "idx_story_parts_session_timestamp" ON "story_parts" ("session_id", "timestamp", "seq")"#,
    ];

    fn from_row(row: Self::Row) -> Self { row }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "story_parts" (
            "id" UUID PRIMARY KEY,
            "session_id" TEXT NOT NULL REFERENCES "sessions" ("id"),
            "content" TEXT NOT NULL,
            "author_id" UUID NOT NULL,
            "author_name" TEXT NOT NULL,
            "timestamp" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "type" TEXT NOT NULL CHECK ("type" IN ('text', 'image')),
            "image_url" TEXT,
            "seq" BIGSERIAL NOT NULL,
            CHECK (("type" = 'image') = ("image_url" IS NOT NULL))
        )"#.to_string()
    }
}

impl SqlxCrud for StoryPart {
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, sqlx::Postgres, Self::Row, sqlx::postgres::PgArguments>)
        -> sqlx::query::QueryAs<'q, sqlx::Postgres, Self::Row, sqlx::postgres::PgArguments>
    {
        query
            .bind(self.id)
            .bind(self.session_id.clone())
            .bind(self.content.clone())
            .bind(self.author_id)
            .bind(self.author_name.clone())
            .bind(self.timestamp)
            .bind(self.part_type)
            .bind(self.image_url.clone())
    }
}

/// An ephemeral candidate continuation. Never stored unless a principal picks it and
/// it is written through `SessionRepository::append_story_part`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPath {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub path_type: PartType,
}

impl StoryPath {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            path_type: PartType::Text,
        }
    }
}
