#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::Engine;
use sqlx::types::Uuid;

use storyloom_runtime::{
    ImageStore, JoinPolicy, MemoryStoryStore, Principal, Session, SessionRepository, StoryBackend,
    StoryGenerator, StoryPart, StoryRuntime, StoryStore, TextRequest,
};

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Replies with a fixed text, or fails when none is set.
#[derive(Default)]
pub struct ScriptedBackend {
    reply: Mutex<Option<String>>,
    requests: Mutex<Vec<TextRequest>>,
    fail_images: AtomicBool,
}

impl ScriptedBackend {
    pub fn replying(reply: &str) -> Arc<Self> {
        let backend = Self::default();
        backend.set_reply(Some(reply));
        Arc::new(backend)
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reply(&self, reply: Option<&str>) {
        *self.reply.lock().unwrap() = reply.map(str::to_string);
    }

    pub fn fail_images(&self, fail: bool) {
        self.fail_images.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StoryBackend for ScriptedBackend {
    async fn complete(&self, request: TextRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.reply.lock().unwrap().clone().ok_or_else(|| anyhow!("backend offline"))
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        if self.fail_images.load(Ordering::SeqCst) {
            return Err(anyhow!("image backend offline"));
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(PNG_BYTES))
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledBackend;

#[async_trait::async_trait]
impl StoryBackend for StalledBackend {
    async fn complete(&self, _request: TextRequest) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("1. too late".into())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

#[derive(Default)]
pub struct MemoryImageStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail: AtomicBool,
}

#[async_trait::async_trait]
impl ImageStore for MemoryImageStore {
    async fn put_png(&self, key: &str, data: Vec<u8>) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("bucket unavailable"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(format!("https://images.test/{}", key))
    }
}

/// Reports every session as still open, the way a read taken just before a concurrent
/// completion would. Writes go to the wrapped store unchanged.
pub struct StaleReadStore(pub MemoryStoryStore);

#[async_trait::async_trait]
impl StoryStore for StaleReadStore {
    async fn insert_session_with_seed(&self, session: &Session, seed: &StoryPart) -> Result<()> {
        self.0.insert_session_with_seed(session, seed).await
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.0.find_session(session_id).await?.map(|mut session| {
            session.is_complete = false;
            session
        }))
    }

    async fn add_participant(&self, session_id: &str, principal: Uuid) -> Result<bool> {
        self.0.add_participant(session_id, principal).await
    }

    async fn insert_part(&self, part: &StoryPart) -> Result<bool> {
        self.0.insert_part(part).await
    }

    async fn list_parts(&self, session_id: &str) -> Result<Vec<StoryPart>> {
        self.0.list_parts(session_id).await
    }

    async fn list_parts_for(&self, session_ids: &[String]) -> Result<Vec<StoryPart>> {
        self.0.list_parts_for(session_ids).await
    }

    async fn sessions_for(&self, principal: Uuid) -> Result<Vec<Session>> {
        self.0.sessions_for(principal).await
    }

    async fn completed_sessions(&self) -> Result<Vec<Session>> {
        self.0.completed_sessions().await
    }

    async fn mark_complete(&self, session_id: &str, owner: Uuid) -> Result<bool> {
        self.0.mark_complete(session_id, owner).await
    }
}

pub struct Harness {
    pub store: MemoryStoryStore,
    pub backend: Arc<ScriptedBackend>,
    pub images: Arc<MemoryImageStore>,
    pub runtime: StoryRuntime,
}

impl Harness {
    pub fn new(policy: JoinPolicy) -> Self {
        let store = MemoryStoryStore::new();
        let backend = ScriptedBackend::replying("1. Foo\n2. Bar\n3. Baz");
        let images = Arc::new(MemoryImageStore::default());

        let repository = SessionRepository::new(Arc::new(store.clone()), policy);
        let generator = StoryGenerator::new(backend.clone(), images.clone(), Duration::from_secs(5));

        Self {
            store,
            backend,
            images,
            runtime: StoryRuntime::new(repository, generator),
        }
    }

    pub fn repository(&self) -> &SessionRepository {
        self.runtime.repository()
    }
}

pub fn principal(name: &str) -> Principal {
    Principal::new(Uuid::new_v4()).with_full_name(name)
}
