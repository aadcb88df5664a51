use std::str::FromStr;

use anyhow::{anyhow, Result};

pub trait EnvVars: Sized {
    fn load() -> Result<Self>;
}

pub fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("{} is not set", key))
}

/// Parses `key`, falling back to `default` when it is unset. A value that does not parse
/// is logged and replaced by `default`.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(key, std::env::var(key).ok(), default)
}

/// Boolean switch accepting `1/0`, `true/false`, `yes/no` and `on/off`.
pub fn env_flag(key: &str, default: bool) -> bool {
    flag_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("[env_or] Ignoring malformed {}={:?}, using the default", key, raw);
            default
        }
    }
}

fn flag_or(key: &str, raw: Option<String>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!("[env_flag] Ignoring malformed {}={:?}, using {}", key, raw, default);
            default
        }
    }
}
