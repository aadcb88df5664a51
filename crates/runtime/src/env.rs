use std::time::Duration;

use anyhow::Result;
use storyloom_common::{env_or, EnvVars};

use crate::JoinPolicy;

pub const DEFAULT_TEXT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct RuntimeEnv {
    pub text_model: String,
    pub image_model: String,
    pub backend_timeout_secs: u64,
    pub join_policy: JoinPolicy,
}

impl RuntimeEnv {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}

impl EnvVars for RuntimeEnv {
    fn load() -> Result<Self> {
        let join_policy = match std::env::var("JOIN_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => JoinPolicy::default(),
        };

        Ok(Self {
            text_model: env_or("STORY_TEXT_MODEL", DEFAULT_TEXT_MODEL.to_string()),
            image_model: env_or("STORY_IMAGE_MODEL", DEFAULT_IMAGE_MODEL.to_string()),
            backend_timeout_secs: env_or("BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS),
            join_policy,
        })
    }
}
