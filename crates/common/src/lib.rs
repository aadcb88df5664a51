mod client;
mod crypto;
mod env;
mod id;

pub use client::ModuleClient;
pub use crypto::{encrypt, decrypt};
pub use env::{EnvVars, env_flag, env_or, required_env};
pub use id::{url_safe_id, SESSION_ID_LEN};

pub fn get_current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
