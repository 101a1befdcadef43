use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};

use kube_pod_watchdog::{
    load_config, ClusterApi, ControlSurface, HealthClassifier, InMemoryMuteStore, KubeCluster,
    MuteGuard, MuteStore, MuteStoreBackend, NamespaceResolver, Notifier, RedisMuteStore, Scheduler,
    TelegramClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    if cfg.namespaces.is_empty() {
        info!("namespaces = all except {:?}", cfg.excluded_namespaces);
    } else {
        info!("namespaces = {:?}", cfg.namespaces);
    }

    let client = Client::try_default().await.context("Failed to build Kubernetes client")?;
    let cluster: Arc<dyn ClusterApi> = Arc::new(KubeCluster::new(client, cfg.cluster_timeout));

    let store: Arc<dyn MuteStore> = match cfg.mute_store {
        MuteStoreBackend::Redis => {
            info!("mute store = redis at {}:{}", cfg.redis.host, cfg.redis.port);
            Arc::new(RedisMuteStore::new(&cfg.redis, cfg.cluster_timeout)?)
        }
        MuteStoreBackend::Memory => {
            warn!(
                "mute store = in-memory, pauses are lost on restart and not shared between replicas"
            );
            Arc::new(InMemoryMuteStore::new())
        }
    };
    info!("mute store failure policy = {:?}", cfg.mute_failure_policy);

    let telegram = TelegramClient::new(&cfg.telegram_api_url, &cfg.telegram_bot_token);
    let resolver = NamespaceResolver::from_config(cluster.clone(), &cfg);

    let scheduler = Arc::new(Scheduler::new(
        resolver.clone(),
        HealthClassifier::new(cluster.clone()),
        MuteGuard::new(store.clone(), cfg.mute_failure_policy),
        Notifier::new(Arc::new(telegram.clone()), cfg.telegram_chat_id.clone()),
        cfg.poll_interval,
    ));
    let control = Arc::new(ControlSurface::new(
        Arc::new(telegram.clone()),
        resolver,
        store,
        cfg.telegram_chat_id.clone(),
        cfg.mute_ttl,
    ));

    // Two independent tasks; they only meet in the mute store
    let scheduler_task = tokio::spawn(scheduler.run());
    let control_task = tokio::spawn(control.run_polling(telegram));

    shutdown_signal().await;
    info!("shutting down");
    scheduler_task.abort();
    control_task.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
