use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kube_pod_watchdog::{
    build_alert_message, classify_pods, CallbackAction, PodObservation, PodSummary,
};

fn alert_formatting_benchmark(c: &mut Criterion) {
    let batch: Vec<PodObservation> = (0..200)
        .map(|i| PodObservation {
            namespace: format!("team-{}", i % 10),
            pod: format!("worker-{}", i),
            phase: if i % 3 == 0 { "Failed" } else { "Pending" }.to_string(),
        })
        .collect();

    c.bench_function("build_alert_message", |b| {
        b.iter(|| black_box(build_alert_message(black_box(&batch))))
    });
}

fn classification_benchmark(c: &mut Criterion) {
    let phases = ["Running", "Succeeded", "Pending", "Failed", "Unknown"];
    let pods: Vec<PodSummary> = (0..1000)
        .map(|i| PodSummary {
            name: format!("pod-{}", i),
            phase: Some(phases[i % phases.len()].to_string()),
        })
        .collect();

    c.bench_function("classify_pods", |b| {
        b.iter(|| black_box(classify_pods(black_box("default"), black_box(&pods))))
    });
}

fn callback_decoding_benchmark(c: &mut Criterion) {
    let payloads = vec![
        "pause_1760572800000",
        "resume_1760572800001",
        "pause_18446744073709551615",
        "resume_default",
        "snooze_1",
        "pause_",
    ];

    c.bench_function("CallbackAction::decode", |b| {
        b.iter(|| {
            for value in &payloads {
                black_box(CallbackAction::decode(black_box(value)));
            }
        })
    });
}

criterion_group!(
    benches,
    alert_formatting_benchmark,
    classification_benchmark,
    callback_decoding_benchmark
);
criterion_main!(benches);
