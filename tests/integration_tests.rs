use std::sync::Arc;
use std::time::Duration;

use kube_pod_watchdog::telegram::{CallbackQuery, Chat, Message, Update};
use kube_pod_watchdog::testutils::{FakeCluster, RecordingChat};
use kube_pod_watchdog::{
    build_alert_message, load_config_with_env, ControlSurface, HealthClassifier,
    InMemoryMuteStore, MockEnvironment, MuteFailurePolicy, MuteGuard, MuteStore,
    NamespaceResolver, Notifier, PodObservation, Scheduler,
};
use tokio_test::{assert_err, assert_ok};

const CHAT: i64 = -1001;

struct Watchdog {
    cluster: Arc<FakeCluster>,
    store: Arc<InMemoryMuteStore>,
    alerts: Arc<RecordingChat>,
    operator: Arc<RecordingChat>,
    scheduler: Arc<Scheduler>,
    control: Arc<ControlSurface>,
}

fn watchdog(cluster: FakeCluster) -> Watchdog {
    let cluster = Arc::new(cluster);
    let store = Arc::new(InMemoryMuteStore::new());
    let alerts = Arc::new(RecordingChat::new());
    let operator = Arc::new(RecordingChat::new());
    let excluded = vec!["kube-system".to_string()];
    let resolver = NamespaceResolver::new(cluster.clone(), Vec::new(), excluded);

    let scheduler = Arc::new(Scheduler::new(
        resolver.clone(),
        HealthClassifier::new(cluster.clone()),
        MuteGuard::new(store.clone(), MuteFailurePolicy::Alert),
        Notifier::new(alerts.clone(), CHAT.to_string()),
        Duration::from_secs(60),
    ));
    let control = Arc::new(ControlSurface::new(
        operator.clone(),
        resolver,
        store.clone(),
        CHAT.to_string(),
        Duration::from_secs(3600),
    ));
    Watchdog { cluster, store, alerts, operator, scheduler, control }
}

fn press(data: &str) -> Update {
    Update {
        update_id: 7,
        message: None,
        callback_query: Some(CallbackQuery {
            id: "press".to_string(),
            data: Some(data.to_string()),
            message: Some(Message {
                message_id: 3,
                chat: Chat { id: CHAT },
                text: None,
            }),
        }),
    }
}

fn command(text: &str) -> Update {
    Update {
        update_id: 8,
        message: Some(Message {
            message_id: 4,
            chat: Chat { id: CHAT },
            text: Some(text.to_string()),
        }),
        callback_query: None,
    }
}

/// Sends `/pause` or `/resume` and returns the payload behind the `namespace` button.
async fn menu_button(w: &Watchdog, cmd: &str, namespace: &str) -> String {
    w.control.handle_update(command(cmd)).await.unwrap();
    let menu = w.operator.sent().last().unwrap().keyboard.clone().unwrap();
    let button = menu.buttons().find(|b| b.text == namespace).unwrap();
    button.callback_data.clone()
}

#[tokio::test]
async fn test_pause_from_chat_silences_next_cycle() {
    let w = watchdog(
        FakeCluster::new()
            .with_namespaces(&["a", "b"])
            .with_pods("a", &[("api-0", "Failed")]),
    );

    let first = assert_ok!(w.scheduler.run_cycle().await);
    assert!(first.dispatched);
    assert_eq!(w.alerts.sent().len(), 1);

    let pause_a = menu_button(&w, "/pause", "a").await;
    assert_ok!(w.control.handle_update(press(&pause_a)).await);
    assert!(w.store.is_muted("a").await.unwrap());

    let second = assert_ok!(w.scheduler.run_cycle().await);
    assert!(!second.dispatched);
    assert_eq!(second.muted, vec!["a"]);
    assert_eq!(w.alerts.sent().len(), 1);
    assert_eq!(w.cluster.pod_calls(), vec!["a", "b", "b"]);

    let resume_a = menu_button(&w, "/resume", "a").await;
    assert_ok!(w.control.handle_update(press(&resume_a)).await);
    let third = assert_ok!(w.scheduler.run_cycle().await);
    assert!(third.dispatched);
    assert_eq!(w.alerts.sent().len(), 2);
}

#[tokio::test]
async fn test_resume_menu_reflects_shared_store() {
    let w = watchdog(FakeCluster::new().with_namespaces(&["a", "team_b"]));

    assert_ok!(w.control.handle_update(command("/resume")).await);
    assert_eq!(w.operator.sent()[0].text, kube_pod_watchdog::control::NOTHING_MUTED_REPLY);

    let pause_b = menu_button(&w, "/pause", "team_b").await;
    assert_ok!(w.control.handle_update(press(&pause_b)).await);
    assert_ok!(w.control.handle_update(command("/resume")).await);

    let menu = w.operator.sent()[2].keyboard.clone().unwrap();
    let labels: Vec<String> = menu.buttons().map(|b| b.text.clone()).collect();
    assert_eq!(labels, vec!["team_b"]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_expires_without_unmute() {
    let w = watchdog(
        FakeCluster::new()
            .with_namespaces(&["a"])
            .with_pods("a", &[("api-0", "Pending")]),
    );

    let pause_a = menu_button(&w, "/pause", "a").await;
    assert_ok!(w.control.handle_update(press(&pause_a)).await);
    assert!(!assert_ok!(w.scheduler.run_cycle().await).dispatched);

    tokio::time::advance(Duration::from_secs(3601)).await;

    assert!(assert_ok!(w.scheduler.run_cycle().await).dispatched);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_and_control_run_concurrently() {
    let w = watchdog(
        FakeCluster::new()
            .with_namespaces(&["a", "b", "c"])
            .with_pods("b", &[("q", "Unknown")]),
    );

    let pause_c = menu_button(&w, "/pause", "c").await;
    assert_ok!(w.control.handle_update(press(&pause_c)).await);
    let resume_c = menu_button(&w, "/resume", "c").await;
    assert_ok!(w.control.handle_update(press(&resume_c)).await);

    let scheduler = w.scheduler.clone();
    let cycles = tokio::spawn(async move {
        for _ in 0..20 {
            let _ = scheduler.run_cycle().await;
        }
    });
    let control = w.control.clone();
    let presses = tokio::spawn(async move {
        for i in 0..20 {
            let data = if i % 2 == 0 { &pause_c } else { &resume_c };
            control.handle_update(press(data)).await.unwrap();
        }
    });

    assert_ok!(cycles.await);
    assert_ok!(presses.await);
    // 20 presses ending on resume
    assert!(!w.store.is_muted("c").await.unwrap());
    assert_eq!(w.operator.answered().len(), 22);
    assert_eq!(w.alerts.sent().len(), 20);
}

#[tokio::test]
async fn test_malformed_press_is_rejected_without_side_effects() {
    let w = watchdog(FakeCluster::new().with_namespaces(&["a"]));

    assert_err!(w.control.handle_update(press("pause")).await);
    assert!(w.store.list_muted().await.unwrap().is_empty());
    assert!(w.operator.edited().is_empty());

    // Ids from another process (or long expired menus) resolve to nothing
    assert_err!(w.control.handle_update(press("pause_1")).await);
    assert!(w.store.list_muted().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_longest_valid_namespace_round_trips_through_menus() {
    let long = format!("payments-{}", "a".repeat(54));
    assert_eq!(long.len(), 63);
    let w = watchdog(
        FakeCluster::new()
            .with_namespaces(&[long.as_str()])
            .with_pods(&long, &[("api-0", "Failed")]),
    );

    let pause = menu_button(&w, "/pause", &long).await;
    assert_ok!(w.control.handle_update(press(&pause)).await);
    assert!(!assert_ok!(w.scheduler.run_cycle().await).dispatched);

    // The resume menu must offer the namespace instead of an empty keyboard
    let resume = menu_button(&w, "/resume", &long).await;
    assert_ok!(w.control.handle_update(press(&resume)).await);
    assert!(assert_ok!(w.scheduler.run_cycle().await).dispatched);
}

#[test]
fn test_alert_message_lists_every_pod() {
    let batch = vec![
        PodObservation {
            namespace: "prod".to_string(),
            pod: "api-1".to_string(),
            phase: "Pending".to_string(),
        },
        PodObservation {
            namespace: "staging".to_string(),
            pod: "worker-2".to_string(),
            phase: "Failed".to_string(),
        },
    ];

    let text = build_alert_message(&batch);

    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("- `prod/api-1`: `Pending`"));
    assert!(text.contains("- `staging/worker-2`: `Failed`"));
}

#[test]
fn test_config_environment_isolation() {
    let empty_env = MockEnvironment::new();
    assert!(load_config_with_env(&empty_env).is_err());

    let env = MockEnvironment::new()
        .with_var("TELEGRAM_BOT_TOKEN", "123:abc")
        .with_var("TELEGRAM_CHAT_ID", "-1001")
        .with_var("NAMESPACES_TO_MONITOR", "ns1, ns2");

    let config = load_config_with_env(&env).unwrap();
    assert_eq!(config.namespaces, vec!["ns1", "ns2"]);
    assert_eq!(config.excluded_namespaces, vec!["kube-system"]);
}
