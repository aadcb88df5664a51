use crate::generator::{GenerationMode, StoryGenerator};
use crate::repository::SessionRepository;
use crate::{Principal, StoryError, StoryPath};

/// Ties persisted sessions to the generator for the requests that need both.
#[derive(Clone)]
pub struct StoryRuntime {
    repository: SessionRepository,
    generator: StoryGenerator,
}

impl StoryRuntime {
    pub fn new(repository: SessionRepository, generator: StoryGenerator) -> Self {
        Self { repository, generator }
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    /// Candidate next steps for a session the principal may read.
    ///
    /// A non-empty `context` switches to image-prompt mode and seeds the backend with it
    /// in place of the stored story text.
    pub async fn generate_paths(
        &self,
        session_id: &str,
        principal: &Principal,
        context: Option<&str>,
    ) -> Result<Vec<StoryPath>, StoryError> {
        let story_text = self.repository.story_text(session_id, Some(principal)).await?;

        let (seed, mode) = match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => (context.to_string(), GenerationMode::ImagePrompt),
            None => (story_text, GenerationMode::Continuation),
        };

        tracing::debug!("[StoryRuntime::generate_paths] {:?} for session {} by {}", mode, session_id, principal.id);
        self.generator.try_generate_continuations(&seed, mode).await
    }

    /// Generates and stores an illustration for a session the principal may write to.
    /// `Ok(None)` means generation or upload failed.
    pub async fn generate_image_for_story(
        &self,
        session_id: &str,
        principal: &Principal,
        prompt: &str,
    ) -> Result<Option<String>, StoryError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StoryError::InvalidInput("prompt must not be empty".into()));
        }

        let session = self.repository.authorize_write(session_id, principal).await?;
        Ok(self.generator.illustrate(principal.id, &session.id, prompt).await)
    }

    pub async fn generate_topics(&self) -> Vec<String> {
        self.generator.generate_topics().await
    }
}
