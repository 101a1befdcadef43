use anyhow::Result;
use std::sync::Arc;

use crate::kubernetes::ClusterApi;
use crate::types::{is_healthy_phase, PodObservation, PodSummary, UNKNOWN_PHASE};

/// Flags pods whose phase is anything other than Running or Succeeded.
#[derive(Clone)]
pub struct HealthClassifier {
    cluster: Arc<dyn ClusterApi>,
}

impl HealthClassifier {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    /// Lists the namespace's pods and returns only the problematic ones.
    pub async fn check_namespace(&self, namespace: &str) -> Result<Vec<PodObservation>> {
        let pods = self.cluster.list_pods(namespace).await?;
        Ok(classify_pods(namespace, &pods))
    }
}

/// Classifies pre-listed pods
pub fn classify_pods(namespace: &str, pods: &[PodSummary]) -> Vec<PodObservation> {
    pods.iter()
        .filter_map(|pod| {
            let phase = pod.phase.as_deref().unwrap_or(UNKNOWN_PHASE);
            if is_healthy_phase(phase) {
                return None;
            }
            Some(PodObservation {
                namespace: namespace.to_string(),
                pod: pod.name.clone(),
                phase: phase.to_string(),
            })
        })
        .collect()
}
