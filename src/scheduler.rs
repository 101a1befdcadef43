use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::classifier::HealthClassifier;
use crate::mute::MuteGuard;
use crate::notifier::Notifier;
use crate::report::CycleReport;
use crate::resolver::NamespaceResolver;

/// Recurring resolve, check, notify loop.
pub struct Scheduler {
    resolver: NamespaceResolver,
    classifier: HealthClassifier,
    mutes: MuteGuard,
    notifier: Notifier,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        resolver: NamespaceResolver,
        classifier: HealthClassifier,
        mutes: MuteGuard,
        notifier: Notifier,
        interval: Duration,
    ) -> Self {
        Self { resolver, classifier, mutes, notifier, interval }
    }

    /// Runs one cycle. Only a resolver failure aborts it; per-namespace and delivery
    /// failures are logged and recorded in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let namespaces = self.resolver.resolve().await?;
        let mut report = CycleReport::new();

        for ns in &namespaces {
            // Asked fresh every cycle, never cached
            if self.mutes.is_muted(ns).await {
                info!("Notifications for {} are paused, skipping", ns);
                report.mark_muted(ns);
                continue;
            }

            match self.classifier.check_namespace(ns).await {
                Ok(observations) => {
                    debug!("{}: {} problematic pods", ns, observations.len());
                    report.add_observations(ns, observations);
                }
                Err(e) => {
                    error!("Failed to check namespace {}: {:#}", ns, e);
                    report.mark_failed(ns);
                }
            }
        }

        if report.has_issues() {
            report.dispatched = true;
            if let Err(e) = self.notifier.send(&report.observations).await {
                error!("{:#}", e);
            }
        }

        Ok(report)
    }

    /// Loops until the task is dropped. Each cycle runs to completion on its own task
    /// so that neither an error nor a panic can end the loop.
    pub async fn run(self: Arc<Self>) {
        info!("scheduler started, interval = {}s", self.interval.as_secs());
        loop {
            let this = self.clone();
            match tokio::spawn(async move { this.run_cycle().await }).await {
                Ok(Ok(report)) => {
                    let summary = report.summary();
                    info!(
                        "Cycle finished over {} namespaces: {} checked, {} paused, {} failed, \
                         {} problematic pods",
                        summary.namespaces_seen(),
                        summary.checked_count,
                        summary.muted_count,
                        summary.failed_count,
                        summary.problematic_count
                    );
                }
                Ok(Err(e)) => error!("Cycle aborted: {:#}", e),
                Err(e) => error!("Cycle panicked: {}", e),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
