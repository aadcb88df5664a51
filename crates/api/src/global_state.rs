use std::sync::Arc;

use storyloom_clients::{LlmClient, PostgresClient, R2Client};
use storyloom_runtime::{
    IdentityProvider, OpenAiStoryBackend, PgStoryStore, RuntimeEnv, SealedTokenProvider,
    SessionRepository, StoryGenerator, StoryRuntime,
};

use crate::ApiServerEnv;

#[derive(Clone)]
pub struct GlobalState {
    pub runtime: StoryRuntime,
    pub identity: Arc<dyn IdentityProvider>,
}

impl GlobalState {
    pub fn new(runtime: StoryRuntime, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { runtime, identity }
    }

    /// Wires the production collaborators.
    pub fn connect(
        db: PostgresClient,
        llm: LlmClient,
        r2: R2Client,
        runtime_env: &RuntimeEnv,
        api_env: &ApiServerEnv,
    ) -> Self {
        let repository = SessionRepository::new(Arc::new(PgStoryStore::new(db)), runtime_env.join_policy);
        let backend = OpenAiStoryBackend::new(llm, &runtime_env.text_model, &runtime_env.image_model);
        let generator = StoryGenerator::new(Arc::new(backend), Arc::new(r2), runtime_env.backend_timeout());
        let identity = SealedTokenProvider::new(&api_env.secret_salt, api_env.token_ttl_secs);

        tracing::info!(
            "[GlobalState::connect] text model {}, image model {}, join policy {}",
            runtime_env.text_model, runtime_env.image_model, runtime_env.join_policy
        );
        Self::new(StoryRuntime::new(repository, generator), Arc::new(identity))
    }
}
