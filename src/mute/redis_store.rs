use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use super::{mute_key, MuteStore, MuteStoreError, MUTE_KEY_PREFIX};
use crate::types::RedisSettings;

/// Mute entries kept as `pause:<namespace>` keys with a server-side expiry.
/// The connection is opened on first use and shared by all callers.
pub struct RedisMuteStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    op_timeout: Duration,
}

impl RedisMuteStore {
    pub fn new(settings: &RedisSettings, op_timeout: Duration) -> Result<Self, MuteStoreError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(settings.host.clone(), settings.port),
            redis: RedisConnectionInfo {
                db: 0,
                username: None,
                password: settings.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)
            .map_err(|e| MuteStoreError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            op_timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, MuteStoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = self.bounded(ConnectionManager::new(self.client.clone())).await?;
                info!("connected to redis mute store");
                Ok::<_, MuteStoreError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, MuteStoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e))
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() =>
            {
                Err(MuteStoreError::Unreachable(e.to_string()))
            }
            Ok(Err(e)) => Err(MuteStoreError::Command(e.to_string())),
            Err(_) => Err(MuteStoreError::Timeout(self.op_timeout)),
        }
    }
}

#[async_trait]
impl MuteStore for RedisMuteStore {
    async fn is_muted(&self, namespace: &str) -> Result<bool, MuteStoreError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.exists(mute_key(namespace))).await
    }

    async fn mute(&self, namespace: &str, ttl: Duration) -> Result<(), MuteStoreError> {
        let mut conn = self.connection().await?;
        let cmd = redis::cmd("SET")
            .arg(mute_key(namespace))
            .arg("true")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .to_owned();
        self.bounded(cmd.query_async::<_, ()>(&mut conn)).await
    }

    async fn unmute(&self, namespace: &str) -> Result<(), MuteStoreError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.del::<_, ()>(mute_key(namespace))).await
    }

    async fn list_muted(&self) -> Result<Vec<String>, MuteStoreError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = self
            .bounded(async {
                let mut iter = conn.scan_match::<_, String>(format!("{}*", MUTE_KEY_PREFIX)).await?;
                let mut keys = Vec::new();
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                Ok(keys)
            })
            .await?;
        Ok(namespaces_from_keys(keys))
    }
}

/// Strips the key prefix, dropping anything that does not carry it. Sorted and deduplicated
/// since SCAN may return a key more than once.
pub fn namespaces_from_keys(keys: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = keys
        .into_iter()
        .filter_map(|k| k.strip_prefix(MUTE_KEY_PREFIX).map(str::to_string))
        .filter(|ns| !ns.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_from_keys() {
        let keys = vec![
            "pause:payments".to_string(),
            "pause:a:b".to_string(),
            "pause:payments".to_string(),
            "pause:".to_string(),
            "other:key".to_string(),
        ];
        assert_eq!(namespaces_from_keys(keys), vec!["a:b", "payments"]);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_reported_not_panicked() {
        let settings = RedisSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            password: None,
        };
        let store = RedisMuteStore::new(&settings, Duration::from_secs(2)).unwrap();
        let err = store.is_muted("default").await.unwrap_err();
        assert!(matches!(err, MuteStoreError::Unreachable(_) | MuteStoreError::Timeout(_)));
    }
}
