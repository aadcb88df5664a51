use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use sqlx::types::Uuid;
use tokio::sync::RwLock;

use super::StoryStore;
use crate::{view::order_parts, Session, StoryPart};

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, Session>,
    // Insertion order doubles as the tie-breaker for equal timestamps.
    parts: Vec<StoryPart>,
}

/// Process-local store with the same contract as the Postgres one.
#[derive(Clone, Default)]
pub struct MemoryStoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_part_inserts: Arc<AtomicBool>,
    fail_participant_updates: Arc<AtomicBool>,
    fail_completions: Arc<AtomicBool>,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every story part insert, seed parts included, fail until switched back.
    pub fn fail_part_inserts(&self, fail: bool) {
        self.fail_part_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes participant updates fail until switched back.
    pub fn fail_participant_updates(&self, fail: bool) {
        self.fail_participant_updates.store(fail, Ordering::SeqCst);
    }

    /// Makes `mark_complete` fail until switched back.
    pub fn fail_completions(&self, fail: bool) {
        self.fail_completions.store(fail, Ordering::SeqCst);
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait::async_trait]
impl StoryStore for MemoryStoryStore {
    async fn insert_session_with_seed(&self, session: &Session, seed: &StoryPart) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.id) {
            return Err(anyhow!("duplicate session id {}", session.id));
        }
        if seed.session_id != session.id {
            return Err(anyhow!("seed part does not belong to session {}", session.id));
        }
        // Checked before either row lands, so a failure leaves nothing behind.
        if self.fail_part_inserts.load(Ordering::SeqCst) {
            return Err(anyhow!("story part insert rejected"));
        }

        tables.sessions.insert(session.id.clone(), session.clone());
        tables.parts.push(seed.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn add_participant(&self, session_id: &str, principal: Uuid) -> Result<bool> {
        if self.fail_participant_updates.load(Ordering::SeqCst) {
            return Err(anyhow!("participant update rejected"));
        }

        let mut tables = self.tables.write().await;
        Ok(tables
            .sessions
            .get_mut(session_id)
            .map(|session| session.join(principal))
            .unwrap_or(false))
    }

    async fn insert_part(&self, part: &StoryPart) -> Result<bool> {
        if self.fail_part_inserts.load(Ordering::SeqCst) {
            return Err(anyhow!("story part insert rejected"));
        }

        let mut tables = self.tables.write().await;
        let open = tables
            .sessions
            .get(&part.session_id)
            .is_some_and(|session| !session.is_complete);
        if !open {
            return Ok(false);
        }
        tables.parts.push(part.clone());
        Ok(true)
    }

    async fn list_parts(&self, session_id: &str) -> Result<Vec<StoryPart>> {
        let tables = self.tables.read().await;
        let parts = tables.parts.iter().filter(|p| p.session_id == session_id).cloned().collect();
        Ok(order_parts(parts))
    }

    async fn list_parts_for(&self, session_ids: &[String]) -> Result<Vec<StoryPart>> {
        let tables = self.tables.read().await;
        let parts = tables
            .parts
            .iter()
            .filter(|p| session_ids.contains(&p.session_id))
            .cloned()
            .collect();
        Ok(order_parts(parts))
    }

    async fn sessions_for(&self, principal: Uuid) -> Result<Vec<Session>> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.is_participant(&principal))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn completed_sessions(&self) -> Result<Vec<Session>> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.is_complete)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn mark_complete(&self, session_id: &str, owner: Uuid) -> Result<bool> {
        if self.fail_completions.load(Ordering::SeqCst) {
            return Err(anyhow!("session update rejected"));
        }

        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(session_id) {
            Some(session) if session.created_by == owner => {
                session.is_complete = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
