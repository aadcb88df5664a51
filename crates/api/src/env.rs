use std::time::Duration;

use anyhow::Result;
use storyloom_common::{env_or, required_env, EnvVars};

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
pub const DEFAULT_PORT: u16 = 3033;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct ApiServerEnv {
    pub secret_salt: String,
    pub token_ttl_secs: i64,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl ApiServerEnv {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl EnvVars for ApiServerEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            secret_salt: required_env("SECRET_SALT")?,
            token_ttl_secs: env_or("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS),
            port: env_or("PORT", DEFAULT_PORT),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}
