//! Process-environment configuration, following the teacher's layered
//! resolution style (`agtrace-runtime::config::resolve_workspace_path`)
//! simplified down to plain env-vars with defaults — there is no file or
//! XDG lookup here, only what the upstream puller itself needed.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub poll_interval_seconds: u64,
    pub dest_dir: String,
    pub state_path: String,
    pub missing_skip_seconds: u64,
}

fn get_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn get_env_u64(name: &str, default: u64) -> Result<u64> {
    match get_env(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got {raw:?}"))),
    }
}

impl Config {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let redis_url =
            get_env("REDIS_URL").ok_or_else(|| Error::Config("REDIS_URL is required".to_string()))?;

        Ok(Config {
            redis_url,
            poll_interval_seconds: get_env_u64("POLL_INTERVAL_SECONDS", 60)?,
            dest_dir: get_env("DEST_DIR").unwrap_or_else(|| "./session".to_string()),
            state_path: get_env("STATE_PATH").unwrap_or_else(|| "./state/state.json".to_string()),
            missing_skip_seconds: get_env_u64("MISSING_SKIP_SECONDS", 300)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for name in [
            "REDIS_URL",
            "POLL_INTERVAL_SECONDS",
            "DEST_DIR",
            "STATE_PATH",
            "MISSING_SKIP_SECONDS",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn missing_redis_url_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_are_applied_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("REDIS_URL", "redis://localhost:6379");
        let config = Config::from_env().unwrap();
        assert_eq!(config.poll_interval_seconds, 60);
        assert_eq!(config.dest_dir, "./session");
        assert_eq!(config.state_path, "./state/state.json");
        assert_eq!(config.missing_skip_seconds, 300);
        clear_all();
    }

    #[test]
    fn non_numeric_interval_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("REDIS_URL", "redis://localhost:6379");
        std::env::set_var("POLL_INTERVAL_SECONDS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        clear_all();
    }
}
