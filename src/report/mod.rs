use crate::types::PodObservation;

/// Everything one scheduler cycle saw, aggregated across namespaces.
#[derive(Debug, Default, Clone)]
pub struct CycleReport {
    pub observations: Vec<PodObservation>,
    pub checked: Vec<String>,
    pub muted: Vec<String>,
    pub failed: Vec<String>,
    /// Whether the batch was handed to the dispatcher this cycle.
    pub dispatched: bool,
}

impl CycleReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observations(&mut self, namespace: &str, observations: Vec<PodObservation>) {
        self.checked.push(namespace.to_string());
        self.observations.extend(observations);
    }

    pub fn mark_muted(&mut self, namespace: &str) {
        self.muted.push(namespace.to_string());
    }

    pub fn mark_failed(&mut self, namespace: &str) {
        self.failed.push(namespace.to_string());
    }

    /// Check if the cycle found any pods worth reporting
    pub fn has_issues(&self) -> bool {
        !self.observations.is_empty()
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            checked_count: self.checked.len(),
            muted_count: self.muted.len(),
            failed_count: self.failed.len(),
            problematic_count: self.observations.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked_count: usize,
    pub muted_count: usize,
    pub failed_count: usize,
    pub problematic_count: usize,
}

impl CycleSummary {
    /// Every namespace the cycle resolved, whatever happened to it.
    pub fn namespaces_seen(&self) -> usize {
        self.checked_count + self.muted_count + self.failed_count
    }
}
