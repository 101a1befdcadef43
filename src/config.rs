use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::time::Duration;

use crate::types::{Config, MuteFailurePolicy, MuteStoreBackend, RedisSettings};

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_EXCLUDED_NAMESPACES: &str = "kube-system";
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_MUTE_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_CLUSTER_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_REDIS_HOST: &str = "redis-service";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let telegram_bot_token = env.get_var("TELEGRAM_BOT_TOKEN")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be provided via Secret env"))?;

    let telegram_chat_id = env.get_var("TELEGRAM_CHAT_ID")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("TELEGRAM_CHAT_ID must be set"))?;
    // Incoming updates carry the numeric chat id, so `@channel` names would never match
    let telegram_chat_id = telegram_chat_id
        .parse::<i64>()
        .with_context(|| {
            format!("Invalid TELEGRAM_CHAT_ID '{}': expected a numeric chat id", telegram_chat_id)
        })?
        .to_string();

    let telegram_api_url = env.get_var("TELEGRAM_API_URL")
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string());

    let namespaces = split_list(&env.get_var("NAMESPACES_TO_MONITOR").unwrap_or_default());
    let excluded_namespaces = split_list(
        &env.get_var("EXCLUDED_NAMESPACES")
            .unwrap_or_else(|| DEFAULT_EXCLUDED_NAMESPACES.to_string()),
    );

    let poll_interval =
        parse_seconds(env, "POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS)?;
    let mute_ttl = parse_seconds(env, "MUTE_TTL_SECONDS", DEFAULT_MUTE_TTL_SECONDS)?;
    let cluster_timeout =
        parse_seconds(env, "CLUSTER_TIMEOUT_SECONDS", DEFAULT_CLUSTER_TIMEOUT_SECONDS)?;

    let mute_store = match env.get_var("MUTE_STORE").as_deref().map(str::trim) {
        None | Some("") => MuteStoreBackend::Redis,
        Some(v) if v.eq_ignore_ascii_case("redis") => MuteStoreBackend::Redis,
        Some(v) if v.eq_ignore_ascii_case("memory") => MuteStoreBackend::Memory,
        Some(other) => bail!("Invalid MUTE_STORE '{}': expected 'redis' or 'memory'", other),
    };

    let redis_port: u16 = match env.get_var("REDIS_PORT") {
        Some(v) => v.trim().parse().context("Invalid REDIS_PORT")?,
        None => DEFAULT_REDIS_PORT,
    };
    let redis = RedisSettings {
        host: env.get_var("REDIS_HOST")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
        port: redis_port,
        password: env.get_var("REDIS_PASSWORD").filter(|v| !v.is_empty()),
    };

    let policy = env.get_var("MUTE_FAILURE_POLICY");
    let mute_failure_policy = match policy.as_deref().map(str::trim) {
        None | Some("") => MuteFailurePolicy::default(),
        Some(v) if v.eq_ignore_ascii_case("alert") => MuteFailurePolicy::Alert,
        Some(v) if v.eq_ignore_ascii_case("suppress") => MuteFailurePolicy::Suppress,
        Some(other) => bail!(
            "Invalid MUTE_FAILURE_POLICY '{}': expected 'alert' or 'suppress'",
            other
        ),
    };

    Ok(Config {
        telegram_bot_token,
        telegram_chat_id,
        telegram_api_url,
        namespaces,
        excluded_namespaces,
        poll_interval,
        mute_ttl,
        cluster_timeout,
        mute_store,
        redis,
        mute_failure_policy,
    })
}

/// Splits a comma-delimited list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_seconds<E: EnvironmentProvider>(env: &E, key: &str, default: u64) -> Result<Duration> {
    let secs: u64 = match env.get_var(key) {
        Some(v) => v.trim().parse().with_context(|| format!("Invalid {}", key))?,
        None => default,
    };
    if secs == 0 {
        bail!("Invalid {}: must be greater than zero", key);
    }
    Ok(Duration::from_secs(secs))
}
