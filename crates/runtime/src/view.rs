use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::{PartType, Principal, Session, StoryPart};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub display_name: String,
}

impl From<&Principal> for CurrentUser {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            display_name: principal.display_name(),
        }
    }
}

/// A session as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub is_complete: bool,
    pub participants: Vec<Uuid>,
    pub parts: Vec<StoryPart>,
    pub is_creator: bool,
    pub current_user: Option<CurrentUser>,
}

/// One entry of a principal's session list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub is_complete: bool,
    pub participant_count: usize,
    pub last_update: DateTime<Utc>,
    pub latest_image: Option<String>,
}

/// A finished story for the public gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedStory {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub parts: Vec<StoryPart>,
    pub cover_image: Option<String>,
}

/// Stable ascending sort by timestamp; equal timestamps keep their incoming order.
pub fn order_parts(mut parts: Vec<StoryPart>) -> Vec<StoryPart> {
    parts.sort_by_key(|p| p.timestamp);
    parts
}

pub fn to_view(session: Session, parts: Vec<StoryPart>, principal: Option<&Principal>) -> SessionView {
    SessionView {
        is_creator: principal.is_some_and(|p| p.id == session.created_by),
        current_user: principal.map(CurrentUser::from),
        parts: order_parts(parts),
        id: session.id,
        title: session.title,
        created_at: session.created_at,
        created_by: session.created_by,
        is_complete: session.is_complete,
        participants: session.participants,
    }
}

pub fn summarize(session: &Session, parts: &[StoryPart]) -> SessionSummary {
    let last_update = parts
        .iter()
        .map(|p| p.timestamp)
        .max()
        .unwrap_or(session.created_at);

    let latest_image = parts
        .iter()
        .filter(|p| p.part_type == PartType::Image && p.image_url.is_some())
        .max_by_key(|p| p.timestamp)
        .and_then(|p| p.image_url.clone());

    SessionSummary {
        id: session.id.clone(),
        title: session.title.clone(),
        created_at: session.created_at,
        created_by: session.created_by,
        is_complete: session.is_complete,
        participant_count: session.participants.len(),
        last_update,
        latest_image,
    }
}

pub fn to_completed_story(session: Session, parts: Vec<StoryPart>) -> CompletedStory {
    let parts = order_parts(parts);
    let cover_image = parts
        .iter()
        .find(|p| p.part_type == PartType::Image && p.image_url.is_some())
        .and_then(|p| p.image_url.clone());

    CompletedStory {
        id: session.id,
        title: session.title,
        created_at: session.created_at,
        created_by: session.created_by,
        parts,
        cover_image,
    }
}

/// Story text fed to the generator: every part's content, blank-line separated.
pub fn story_text(parts: &[StoryPart]) -> String {
    parts
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
