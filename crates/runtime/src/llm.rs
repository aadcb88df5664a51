use anyhow::{anyhow, Result};
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, CreateImageRequestArgs,
    Image, ImageModel, ImageSize,
};
use base64::Engine;

use storyloom_clients::LlmClient;
use storyloom_common::ModuleClient;

use crate::generator::{StoryBackend, TextRequest};

/// `StoryBackend` over an OpenAI compatible API.
#[derive(Clone)]
pub struct OpenAiStoryBackend {
    llm: LlmClient,
    text_model: String,
    image_model: String,
}

impl OpenAiStoryBackend {
    pub fn new(llm: LlmClient, text_model: impl Into<String>, image_model: impl Into<String>) -> Self {
        Self {
            llm,
            text_model: text_model.into(),
            image_model: image_model.into(),
        }
    }
}

#[async_trait::async_trait]
impl StoryBackend for OpenAiStoryBackend {
    async fn complete(&self, request: TextRequest) -> Result<String> {
        let messages = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt)
                .build()?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.text_model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()?;

        let response = self.llm.get_client().chat().create(chat_request).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!("[OpenAiStoryBackend::complete] {} used {} tokens", self.text_model, usage.total_tokens);
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("[OpenAiStoryBackend::complete] Empty completion from {}", self.text_model))
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let image_request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(ImageModel::Other(self.image_model.clone()))
            .n(1)
            .size(ImageSize::S1024x1024)
            .build()?;

        let response = self.llm.get_client().images().create(image_request).await?;
        let image = response
            .data
            .first()
            .ok_or_else(|| anyhow!("[OpenAiStoryBackend::generate_image] No image returned by {}", self.image_model))?;

        match image.as_ref() {
            Image::B64Json { b64_json, .. } => Ok(b64_json.to_string()),
            Image::Url { url, .. } => {
                tracing::debug!("[OpenAiStoryBackend::generate_image] Downloading image from {}", url);
                let bytes = reqwest::get(url).await?.error_for_status()?.bytes().await?;
                Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}
