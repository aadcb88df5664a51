use std::time::Duration;

use storyloom_common::{define_module_client, env_or, required_env};

use async_openai::{config::OpenAIConfig, Client};

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

define_module_client! {
    (struct LlmClient, "llm")
    client_type: Client<OpenAIConfig>,
    env: ["OPENAI_BASE_URL", "OPENAI_API_KEY"],
    setup: async {
        let base_url = required_env("OPENAI_BASE_URL")?;
        let api_key = required_env("OPENAI_API_KEY")?;
        let timeout = env_or("BACKEND_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS);

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        anyhow::Ok(Client::build(
            http_client,
            openai_config,
            Default::default()
        ))
    }
}
