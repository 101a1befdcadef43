// Public modules
pub mod types;
pub mod config;
pub mod kubernetes;
pub mod resolver;
pub mod classifier;
pub mod mute;
pub mod telegram;
pub mod notifier;
pub mod report;
pub mod scheduler;
pub mod control;
pub mod testutils;

// Re-export commonly used items
pub use types::*;
pub use config::{
    load_config, load_config_with_env, EnvironmentProvider, MockEnvironment, SystemEnvironment,
};
pub use kubernetes::{ClusterApi, KubeCluster};
pub use resolver::NamespaceResolver;
pub use classifier::{classify_pods, HealthClassifier};
pub use mute::{InMemoryMuteStore, MuteGuard, MuteStore, MuteStoreError, RedisMuteStore};
pub use telegram::{ChatApi, TelegramClient, TelegramError};
pub use notifier::{build_alert_message, Notifier};
pub use report::{CycleReport, CycleSummary};
pub use scheduler::Scheduler;
pub use control::{CallbackAction, Command, ControlSurface};
