use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Result;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::image::{story_image_key, ImageStore};
use crate::{StoryError, StoryPath};

pub const CONTINUATION_COUNT: usize = 3;
pub const TOPIC_COUNT: usize = 5;

const TEMPERATURE: f32 = 0.8;
const CONTINUATION_MAX_TOKENS: u32 = 500;
const IMAGE_PROMPT_MAX_TOKENS: u32 = 200;
const TOPIC_MAX_TOKENS: u32 = 500;

pub const FALLBACK_TOPICS: [&str; TOPIC_COUNT] = [
    "A mysterious door appears in a forest",
    "Time suddenly stops for everyone except you",
    "An ancient artifact is discovered in your backyard",
    "You can suddenly understand animal languages",
    "A letter arrives from a parallel universe",
];

// A numbering marker such as "1. ", "2) " or "**3.** ", at the start of a line or after
// whitespace. Group 1 is the leading whitespace, group 2 the number.
static NUMBERING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(^|\s)[ \t]*(?:\*\*)?(\d+)[.)](?:\*\*)?[ \t]+").expect("numbering pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    Continuation,
    ImagePrompt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The text and image model API.
#[async_trait::async_trait]
pub trait StoryBackend: Send + Sync {
    async fn complete(&self, request: TextRequest) -> Result<String>;

    /// Returns the generated image as base64 encoded PNG data.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

/// Splits model output on numbering markers.
///
/// A marker counts when it starts a line, or when it sits inside a line and continues
/// the count ("1. Foo 2. Bar"). Other inline numbers ("In 1999. the door") stay in the
/// item. Text before the first marker is preamble and dropped. Output with no markers at
/// all is taken as a single item. Empty segments are discarded and at most `max` items
/// are kept. Never fails.
pub fn parse_numbered_list(text: &str, max: usize) -> Vec<String> {
    let markers = list_markers(text);

    let segments: Vec<&str> = if markers.is_empty() {
        vec![text]
    } else {
        markers
            .iter()
            .enumerate()
            .map(|(i, &(_, end))| {
                let stop = markers.get(i + 1).map_or(text.len(), |&(start, _)| start);
                &text[end..stop]
            })
            .collect()
    };

    segments
        .into_iter()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Byte spans of the accepted numbering markers, in order.
fn list_markers(text: &str) -> Vec<(usize, usize)> {
    let mut markers = Vec::new();
    let mut last: Option<u64> = None;

    for caps in NUMBERING.captures_iter(text) {
        let (Some(marker), Some(lead), Some(number)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let number = number.as_str().parse::<u64>().ok();
        let line_start = lead.as_str().is_empty() || lead.as_str().contains('\n');
        let continues = match (last, number) {
            (None, Some(n)) => n == 1,
            (Some(prev), Some(n)) => n == prev + 1,
            _ => false,
        };

        if line_start || continues {
            markers.push((marker.start(), marker.end()));
            last = number;
        }
    }
    markers
}

fn continuation_prompt(story_text: &str) -> String {
    format!(
        "You are a creative writing assistant working on a collaborative story.\n\
         The story so far:\n\n{story_text}\n\n\
         Write {CONTINUATION_COUNT} different ways the story could continue. Each continuation must:\n\
         - be 2-3 sentences long\n\
         - take the story somewhere new while staying consistent with what happened\n\
         - carry some surprise or intrigue\n\
         - differ in tone and style from the others\n\n\
         Answer with a numbered list (1., 2., 3.) and nothing else."
    )
}

fn image_prompt_prompt(seed: &str) -> String {
    format!(
        "You are a creative writing assistant writing a prompt for an image model.\n\
         The story so far:\n\n{seed}\n\n\
         Describe one key moment or scene of this story as a single vivid image prompt. \
         Mention the setting, the characters and the atmosphere. \
         Keep it to 1-2 sentences and answer with the prompt only."
    )
}

fn topics_prompt() -> String {
    format!(
        "Suggest {TOPIC_COUNT} creative and engaging opening prompts for a collaborative storytelling app. \
         Each should be 1-2 sentences with an element of mystery, fantasy or science fiction, \
         and they should differ in tone and setting.\n\
         Answer with a numbered list (1., 2., etc.) and nothing else."
    )
}

/// Produces candidate content. Never touches persisted state.
#[derive(Clone)]
pub struct StoryGenerator {
    backend: Arc<dyn StoryBackend>,
    images: Arc<dyn ImageStore>,
    timeout: Duration,
}

impl StoryGenerator {
    pub fn new(backend: Arc<dyn StoryBackend>, images: Arc<dyn ImageStore>, timeout: Duration) -> Self {
        Self { backend, images, timeout }
    }

    /// Candidate paths, or an empty list when the backend is unavailable.
    pub async fn generate_continuations(&self, story_text: &str, mode: GenerationMode) -> Vec<StoryPath> {
        match self.try_generate_continuations(story_text, mode).await {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("[StoryGenerator::generate_continuations] No suggestions: {}", e);
                Vec::new()
            }
        }
    }

    /// Like `generate_continuations` but reports backend failures.
    pub async fn try_generate_continuations(
        &self,
        story_text: &str,
        mode: GenerationMode,
    ) -> Result<Vec<StoryPath>, StoryError> {
        let request = match mode {
            GenerationMode::Continuation => TextRequest {
                prompt: continuation_prompt(story_text),
                temperature: TEMPERATURE,
                max_tokens: CONTINUATION_MAX_TOKENS,
            },
            GenerationMode::ImagePrompt => TextRequest {
                prompt: image_prompt_prompt(story_text),
                temperature: TEMPERATURE,
                max_tokens: IMAGE_PROMPT_MAX_TOKENS,
            },
        };

        let text = self.complete(request).await?;

        let paths = match mode {
            GenerationMode::Continuation => parse_numbered_list(&text, CONTINUATION_COUNT)
                .into_iter()
                .map(StoryPath::text)
                .collect(),
            GenerationMode::ImagePrompt => {
                let prompt = text.trim();
                if prompt.is_empty() {
                    Vec::new()
                } else {
                    vec![StoryPath::text(prompt)]
                }
            }
        };

        tracing::debug!("[StoryGenerator::try_generate_continuations] {:?} produced {} paths", mode, paths.len());
        Ok(paths)
    }

    /// Opening topics for a new session. Falls back to a fixed list.
    pub async fn generate_topics(&self) -> Vec<String> {
        let request = TextRequest {
            prompt: topics_prompt(),
            temperature: TEMPERATURE,
            max_tokens: TOPIC_MAX_TOKENS,
        };

        let topics = match self.complete(request).await {
            Ok(text) => parse_numbered_list(&text, TOPIC_COUNT),
            Err(e) => {
                tracing::warn!("[StoryGenerator::generate_topics] Using fallback topics: {}", e);
                Vec::new()
            }
        };

        if topics.is_empty() {
            return FALLBACK_TOPICS.iter().map(|t| t.to_string()).collect();
        }
        topics
    }

    /// Generates an image and stores it under `{principal}/{session}/`. Returns its
    /// public URL, or `None` if any step fails. An image that did not make it to storage
    /// is never returned.
    pub async fn illustrate(&self, principal_id: Uuid, session_id: &str, prompt: &str) -> Option<String> {
        match self.try_illustrate(principal_id, session_id, prompt).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!("[StoryGenerator::illustrate] Image for session {} failed: {}", session_id, e);
                None
            }
        }
    }

    async fn try_illustrate(&self, principal_id: Uuid, session_id: &str, prompt: &str) -> Result<String, StoryError> {
        if prompt.trim().is_empty() {
            return Err(StoryError::InvalidInput("image prompt must not be empty".into()));
        }

        let encoded = tokio::time::timeout(self.timeout, self.backend.generate_image(prompt))
            .await
            .map_err(|_| StoryError::GenerationUnavailable("image generation timed out".into()))?
            .map_err(|e| StoryError::GenerationUnavailable(e.to_string()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| StoryError::GenerationUnavailable(format!("undecodable image payload: {}", e)))?;
        if data.is_empty() {
            return Err(StoryError::GenerationUnavailable("empty image payload".into()));
        }

        let key = story_image_key(principal_id, session_id);
        let url = tokio::time::timeout(self.timeout, self.images.put_png(&key, data))
            .await
            .map_err(|_| StoryError::persistence(anyhow::anyhow!("image upload timed out")))?
            .map_err(StoryError::persistence)?;

        tracing::info!("[StoryGenerator::illustrate] Stored image {}", key);
        Ok(url)
    }

    async fn complete(&self, request: TextRequest) -> Result<String, StoryError> {
        tokio::time::timeout(self.timeout, self.backend.complete(request))
            .await
            .map_err(|_| StoryError::GenerationUnavailable("text generation timed out".into()))?
            .map_err(|e| StoryError::GenerationUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_numbered_list() {
        assert_eq!(parse_numbered_list("1. Foo\n2. Bar\n3. Baz", 3), vec!["Foo", "Bar", "Baz"]);
    }

    #[test]
    fn drops_preamble_and_extra_items() {
        let text = "Here are some options:\n\n1. Foo goes on.\n2) Bar\n**3.** Baz\n4. Qux";
        assert_eq!(parse_numbered_list(text, 3), vec!["Foo goes on.", "Bar", "Baz"]);
    }

    #[test]
    fn keeps_multiline_items_and_inline_numbers() {
        let text = "1. In 1999. the door\nopened.\n2. Nothing";
        assert_eq!(parse_numbered_list(text, 3), vec!["In 1999. the door\nopened.", "Nothing"]);
    }

    #[test]
    fn splits_lists_written_on_one_line() {
        assert_eq!(parse_numbered_list("1. Foo 2. Bar 3. Baz", 3), vec!["Foo", "Bar", "Baz"]);
        assert_eq!(
            parse_numbered_list("Here you go: 1. Foo. 2) Bar. 3. Baz.", 3),
            vec!["Foo.", "Bar.", "Baz."]
        );
        assert_eq!(parse_numbered_list("1. Foo was 2. Bar was 7. late", 3), vec!["Foo was", "Bar was 7. late"]);
    }

    #[test]
    fn malformed_output_degrades() {
        assert_eq!(parse_numbered_list("Just some prose.", 3), vec!["Just some prose."]);
        assert!(parse_numbered_list("", 3).is_empty());
        assert!(parse_numbered_list("   \n  ", 3).is_empty());
        assert!(parse_numbered_list("1. \n2.  \n", 3).is_empty());
        assert!(parse_numbered_list("1. Foo", 0).is_empty());
    }
}
