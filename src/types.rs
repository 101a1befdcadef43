use std::time::Duration;

/// Pod phases that are never reported.
pub const HEALTHY_PHASES: [&str; 2] = ["Running", "Succeeded"];

/// Phase reported for pods whose status carries no phase at all.
pub const UNKNOWN_PHASE: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,
    /// Static allow-list; when non-empty the cluster is never asked for namespaces.
    pub namespaces: Vec<String>,
    pub excluded_namespaces: Vec<String>,
    pub poll_interval: Duration,
    pub mute_ttl: Duration,
    pub cluster_timeout: Duration,
    pub mute_store: MuteStoreBackend,
    pub redis: RedisSettings,
    pub mute_failure_policy: MuteFailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteStoreBackend {
    Redis,
    Memory,
}

/// What the scheduler does when the mute store cannot be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuteFailurePolicy {
    /// Treat the namespace as not muted and keep alerting.
    #[default]
    Alert,
    /// Treat the namespace as muted and skip it for this cycle.
    Suppress,
}

/// A pod as returned by the cluster, reduced to what the classifier reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSummary {
    pub name: String,
    pub phase: Option<String>,
}

/// One problematic pod seen during a cycle. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodObservation {
    pub namespace: String,
    pub pod: String,
    pub phase: String,
}

pub fn is_healthy_phase(phase: &str) -> bool {
    HEALTHY_PHASES.contains(&phase)
}
