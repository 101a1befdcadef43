// Mute store backends
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::types::MuteFailurePolicy;

pub use self::memory::InMemoryMuteStore;
pub use self::redis_store::RedisMuteStore;

/// Key prefix for mute entries in the shared store.
pub const MUTE_KEY_PREFIX: &str = "pause:";

#[derive(Debug, Error)]
pub enum MuteStoreError {
    #[error("mute store unreachable: {0}")]
    Unreachable(String),

    #[error("mute store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("mute store command failed: {0}")]
    Command(String),
}

/// Time-bounded presence registry keyed by namespace. Implementations provide
/// per-key atomicity and enforce expiry themselves.
#[async_trait]
pub trait MuteStore: Send + Sync {
    async fn is_muted(&self, namespace: &str) -> Result<bool, MuteStoreError>;

    /// Creates or refreshes the entry; re-muting resets the TTL.
    async fn mute(&self, namespace: &str, ttl: Duration) -> Result<(), MuteStoreError>;

    /// Removes the entry if present.
    async fn unmute(&self, namespace: &str) -> Result<(), MuteStoreError>;

    /// Currently muted namespaces, sorted.
    async fn list_muted(&self) -> Result<Vec<String>, MuteStoreError>;
}

pub fn mute_key(namespace: &str) -> String {
    format!("{}{}", MUTE_KEY_PREFIX, namespace)
}

/// Applies the configured failure policy to mute lookups made by the scheduler.
#[derive(Clone)]
pub struct MuteGuard {
    store: Arc<dyn MuteStore>,
    policy: MuteFailurePolicy,
}

impl MuteGuard {
    pub fn new(store: Arc<dyn MuteStore>, policy: MuteFailurePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn is_muted(&self, namespace: &str) -> bool {
        match self.store.is_muted(namespace).await {
            Ok(muted) => muted,
            Err(e) => {
                let muted = self.policy == MuteFailurePolicy::Suppress;
                let treated_as = if muted { "muted" } else { "not muted" };
                warn!("Mute lookup for {} failed ({}), treating as {}", namespace, e, treated_as);
                muted
            }
        }
    }
}
