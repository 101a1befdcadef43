use anyhow::{Context, Result};
use std::sync::Arc;

use crate::kubernetes::ClusterApi;
use crate::types::Config;

/// Computes the working set of namespaces. Holds no state between calls so every
/// caller sees the cluster as it is now.
#[derive(Clone)]
pub struct NamespaceResolver {
    cluster: Arc<dyn ClusterApi>,
    static_namespaces: Vec<String>,
    excluded: Vec<String>,
}

impl NamespaceResolver {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        static_namespaces: Vec<String>,
        excluded: Vec<String>,
    ) -> Self {
        Self { cluster, static_namespaces, excluded }
    }

    pub fn from_config(cluster: Arc<dyn ClusterApi>, cfg: &Config) -> Self {
        Self::new(cluster, cfg.namespaces.clone(), cfg.excluded_namespaces.clone())
    }

    /// The static allow-list verbatim when configured, otherwise every cluster
    /// namespace not in the exclude list, in cluster order.
    pub async fn resolve(&self) -> Result<Vec<String>> {
        if !self.static_namespaces.is_empty() {
            return Ok(self.static_namespaces.clone());
        }

        let all = self.cluster.list_namespaces().await.context("Failed to list namespaces")?;
        let mut resolved: Vec<String> = Vec::with_capacity(all.len());
        for ns in all {
            if self.is_excluded(&ns) || resolved.contains(&ns) {
                continue;
            }
            resolved.push(ns);
        }
        Ok(resolved)
    }

    fn is_excluded(&self, namespace: &str) -> bool {
        self.excluded.iter().any(|ex| ex.eq_ignore_ascii_case(namespace))
    }
}
