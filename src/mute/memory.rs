use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::{MuteStore, MuteStoreError};

/// Process-local mute store. Entries expire on their own; expired keys are
/// dropped the next time the map is touched.
#[derive(Debug, Default)]
pub struct InMemoryMuteStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryMuteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_entries(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        entries.retain(|_, expiry| *expiry > now);
        entries
    }
}

#[async_trait]
impl MuteStore for InMemoryMuteStore {
    async fn is_muted(&self, namespace: &str) -> Result<bool, MuteStoreError> {
        Ok(self.live_entries().contains_key(namespace))
    }

    async fn mute(&self, namespace: &str, ttl: Duration) -> Result<(), MuteStoreError> {
        self.live_entries().insert(namespace.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn unmute(&self, namespace: &str) -> Result<(), MuteStoreError> {
        self.live_entries().remove(namespace);
        Ok(())
    }

    async fn list_muted(&self) -> Result<Vec<String>, MuteStoreError> {
        let mut names: Vec<String> = self.live_entries().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
