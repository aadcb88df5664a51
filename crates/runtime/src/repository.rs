use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Url;

use crate::access::{self, decide_read, JoinPolicy, ReadDecision};
use crate::store::StoryStore;
use crate::view::{self, CompletedStory, SessionSummary, SessionView};
use crate::{AccessError, PartType, Principal, Session, StoryError, StoryPart};

/// Session CRUD with the access rules applied on every call.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn StoryStore>,
    join_policy: JoinPolicy,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn StoryStore>, join_policy: JoinPolicy) -> Self {
        Self { store, join_policy }
    }

    /// Creates a session and its seed part in one unit. Returns the new session id.
    pub async fn create_session(&self, principal: &Principal, topic: &str) -> Result<String, StoryError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StoryError::InvalidInput("topic must not be empty".into()));
        }

        let session = Session::new(principal.id, topic);
        let seed = StoryPart::new(
            &session.id,
            topic,
            principal.id,
            &principal.display_name(),
            PartType::Text,
            None,
        );

        self.store
            .insert_session_with_seed(&session, &seed)
            .await
            .map_err(|e| {
                tracing::error!("[SessionRepository::create_session] Failed to create session for {}: {:?}", principal.id, e);
                StoryError::persistence(e)
            })?;

        tracing::info!("[SessionRepository::create_session] Session {} created by {}", session.id, principal.id);
        Ok(session.id)
    }

    /// The session as `principal` may see it, or `None` when it is missing or off limits.
    pub async fn get_session(&self, session_id: &str, principal: Option<&Principal>) -> Option<SessionView> {
        match self.load_view(session_id, principal).await {
            Ok(view) => Some(view),
            Err(StoryError::Access(AccessError::NotFound(_))) => {
                tracing::warn!("[SessionRepository::get_session] Session {} not found", session_id);
                None
            }
            Err(StoryError::Access(e)) => {
                tracing::warn!("[SessionRepository::get_session] Access denied: {}", e);
                None
            }
            Err(e) => {
                tracing::error!("[SessionRepository::get_session] Failed to load session {}: {:?}", session_id, e);
                None
            }
        }
    }

    pub async fn load_view(&self, session_id: &str, principal: Option<&Principal>) -> Result<SessionView, StoryError> {
        let mut session = self.authorize_read(session_id, principal).await?;
        let parts = self.store.list_parts(&session.id).await.map_err(StoryError::persistence)?;

        // Reflect a join in the view even if persisting it failed.
        if let Some(principal) = principal {
            if !session.is_complete {
                session.join(principal.id);
            }
        }

        Ok(view::to_view(session, parts, principal))
    }

    /// Loads a session and applies the read rules, joining the principal when the rules
    /// call for it. A failed join is logged and otherwise ignored.
    pub async fn authorize_read(&self, session_id: &str, principal: Option<&Principal>) -> Result<Session, StoryError> {
        let session = self.find(session_id).await?;

        match decide_read(principal, &session, self.join_policy)? {
            ReadDecision::Granted => {}
            ReadDecision::GrantedWithJoin => {
                if let Some(principal) = principal {
                    match self.store.add_participant(&session.id, principal.id).await {
                        Ok(true) => tracing::info!(
                            "[SessionRepository::authorize_read] {} joined session {}", principal.id, session.id
                        ),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(
                            "[SessionRepository::authorize_read] Failed to add {} to session {}: {:?}",
                            principal.id, session.id, e
                        ),
                    }
                }
            }
        }

        Ok(session)
    }

    /// Loads a session that `principal` may append to.
    pub async fn authorize_write(&self, session_id: &str, principal: &Principal) -> Result<Session, StoryError> {
        let session = self.find(session_id).await?;
        access::authorize_write(principal, &session)?;
        Ok(session)
    }

    /// Every session `principal` created or joined, newest first.
    pub async fn list_sessions_for(&self, principal: &Principal) -> Result<Vec<SessionSummary>, StoryError> {
        let sessions = self.store.sessions_for(principal.id).await.map_err(StoryError::persistence)?;
        let parts = self.parts_by_session(&sessions).await?;

        Ok(sessions
            .iter()
            .map(|session| {
                let parts = parts.get(&session.id).map(Vec::as_slice).unwrap_or(&[]);
                view::summarize(session, parts)
            })
            .collect())
    }

    /// Completed sessions with their parts, newest first. Public.
    pub async fn list_completed_sessions(&self) -> Result<Vec<CompletedStory>, StoryError> {
        let sessions = self.store.completed_sessions().await.map_err(StoryError::persistence)?;
        let mut parts = self.parts_by_session(&sessions).await?;

        Ok(sessions
            .into_iter()
            .map(|session| {
                let session_parts = parts.remove(&session.id).unwrap_or_default();
                view::to_completed_story(session, session_parts)
            })
            .collect())
    }

    /// Appends a part. `false` means nothing was written.
    pub async fn append_story_part(
        &self,
        session_id: &str,
        principal: &Principal,
        content: &str,
        part_type: PartType,
        image_url: Option<&str>,
    ) -> bool {
        match self.try_append_story_part(session_id, principal, content, part_type, image_url).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "[SessionRepository::append_story_part] Rejected part from {} for session {}: {}",
                    principal.id, session_id, e
                );
                false
            }
        }
    }

    pub async fn try_append_story_part(
        &self,
        session_id: &str,
        principal: &Principal,
        content: &str,
        part_type: PartType,
        image_url: Option<&str>,
    ) -> Result<(), StoryError> {
        let image_url = validate_image_url(part_type, image_url)?;
        if part_type == PartType::Text && content.trim().is_empty() {
            return Err(StoryError::InvalidInput("text parts need content".into()));
        }

        let session = self.authorize_write(session_id, principal).await?;
        let part = StoryPart::new(
            &session.id,
            content,
            principal.id,
            &principal.display_name(),
            part_type,
            image_url,
        );

        // The store re-checks that the session is still open in the same statement, so a
        // completion that lands after `authorize_write` cannot be written past.
        let inserted = self.store.insert_part(&part).await.map_err(StoryError::persistence)?;
        if !inserted {
            return Err(AccessError::Denied {
                session_id: session.id,
                principal: principal.id.to_string(),
            }
            .into());
        }
        tracing::debug!("[SessionRepository::append_story_part] Part {} added to session {}", part.id, session.id);
        Ok(())
    }

    /// Marks the session complete. Only the creator may do this; repeating it is a no-op.
    pub async fn complete_session(&self, session_id: &str, principal: &Principal) -> bool {
        match self.try_complete_session(session_id, principal).await {
            Ok(()) => true,
            Err(e @ StoryError::Persistence(_)) => {
                tracing::error!("[SessionRepository::complete_session] Failed to complete {}: {:?}", session_id, e);
                false
            }
            Err(e) => {
                tracing::warn!("[SessionRepository::complete_session] {}", e);
                false
            }
        }
    }

    pub async fn try_complete_session(&self, session_id: &str, principal: &Principal) -> Result<(), StoryError> {
        let session = self.find(session_id).await?;

        if !access::is_owner(Some(principal), &session) {
            return Err(AccessError::Denied {
                session_id: session.id,
                principal: principal.id.to_string(),
            }
            .into());
        }

        if session.is_complete {
            return Ok(());
        }

        let updated = self.store
            .mark_complete(&session.id, principal.id)
            .await
            .map_err(StoryError::persistence)?;
        if !updated {
            return Err(AccessError::NotFound(session.id).into());
        }

        tracing::info!("[SessionRepository::complete_session] Session {} completed", session.id);
        Ok(())
    }

    /// Concatenated story text of a session the principal may read.
    pub async fn story_text(&self, session_id: &str, principal: Option<&Principal>) -> Result<String, StoryError> {
        let session = self.authorize_read(session_id, principal).await?;
        let parts = self.store.list_parts(&session.id).await.map_err(StoryError::persistence)?;
        Ok(view::story_text(&parts))
    }

    async fn find(&self, session_id: &str) -> Result<Session, StoryError> {
        self.store
            .find_session(session_id)
            .await
            .map_err(StoryError::persistence)?
            .ok_or_else(|| AccessError::NotFound(session_id.to_string()).into())
    }

    async fn parts_by_session(&self, sessions: &[Session]) -> Result<HashMap<String, Vec<StoryPart>>, StoryError> {
        let ids: Vec<String> = sessions.iter().map(|s| s.id.clone()).collect();
        let parts = self.store.list_parts_for(&ids).await.map_err(StoryError::persistence)?;

        let mut grouped: HashMap<String, Vec<StoryPart>> = HashMap::new();
        for part in parts {
            grouped.entry(part.session_id.clone()).or_default().push(part);
        }
        Ok(grouped)
    }
}

/// Image parts need an absolute http(s) URL; text parts must not carry one.
fn validate_image_url(part_type: PartType, image_url: Option<&str>) -> Result<Option<String>, StoryError> {
    let image_url = image_url.map(str::trim).filter(|url| !url.is_empty());

    match (part_type, image_url) {
        (PartType::Text, None) => Ok(None),
        (PartType::Text, Some(_)) => Err(StoryError::InvalidInput("text parts cannot carry an image url".into())),
        (PartType::Image, None) => Err(StoryError::InvalidInput("image parts need an image url".into())),
        (PartType::Image, Some(url)) => {
            let parsed = Url::parse(url)
                .map_err(|e| StoryError::InvalidInput(format!("invalid image url: {}", e)))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                return Err(StoryError::InvalidInput(format!("image url must be http(s): {}", url)));
            }
            Ok(Some(parsed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_are_validated_per_part_type() {
        assert!(matches!(validate_image_url(PartType::Text, None), Ok(None)));
        assert!(matches!(validate_image_url(PartType::Text, Some("  ")), Ok(None)));
        assert!(validate_image_url(PartType::Text, Some("https://cdn/x.png")).is_err());
        assert!(validate_image_url(PartType::Image, None).is_err());
        assert!(validate_image_url(PartType::Image, Some("")).is_err());
        assert!(validate_image_url(PartType::Image, Some("not a url")).is_err());
        assert!(validate_image_url(PartType::Image, Some("ftp://cdn/x.png")).is_err());
        assert!(matches!(
            validate_image_url(PartType::Image, Some("https://cdn.example/u/s/x.png")),
            Ok(Some(url)) if url == "https://cdn.example/u/s/x.png"
        ));
    }
}
