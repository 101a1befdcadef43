use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::{api::ListParams, Api, Client};
use std::future::Future;
use std::time::Duration;

use crate::types::PodSummary;

/// Read-only view of the cluster used by the resolver and the classifier.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// All namespace names, in the order the cluster reports them.
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>>;
}

/// `ClusterApi` backed by the Kubernetes API server. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    timeout: Duration,
}

impl KubeCluster {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(anyhow!("{} timed out after {}s", what, self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = self.bounded("listing namespaces", api.list(&ListParams::default())).await?;
        Ok(list.items.into_iter().filter_map(|ns| ns.metadata.name).collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let what = format!("listing pods in {}", namespace);
        let list = self.bounded(&what, api.list(&ListParams::default())).await?;
        Ok(list.items.iter().filter_map(pod_summary).collect())
    }
}

/// Reduces a pod to its name and phase. Pods without a name are dropped.
pub fn pod_summary(pod: &Pod) -> Option<PodSummary> {
    let name = pod.metadata.name.clone()?;
    let phase = pod.status.as_ref().and_then(|s| s.phase.clone());
    Some(PodSummary { name, phase })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: Option<&str>, phase: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: name.map(String::from),
                ..Default::default()
            },
            status: phase.map(|p| PodStatus {
                phase: Some(p.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_pod_summary() {
        assert_eq!(
            pod_summary(&pod(Some("api-0"), Some("Pending"))),
            Some(PodSummary { name: "api-0".to_string(), phase: Some("Pending".to_string()) })
        );
        assert_eq!(
            pod_summary(&pod(Some("api-1"), None)),
            Some(PodSummary { name: "api-1".to_string(), phase: None })
        );
        assert_eq!(pod_summary(&pod(None, Some("Running"))), None);
    }
}
