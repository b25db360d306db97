//! Benchmarks for hub fan-out
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use telemetry_hub::{HubConfig, Reading, Subscription, TelemetryHub};

fn sample_reading() -> Reading {
    Reading::from_value(json!({
        "heartRate": 72,
        "temperature": 36.6,
        "motion": {"x": 0.01, "y": -0.02, "z": 0.98},
    }))
    .unwrap()
}

fn drain(subs: &mut [Subscription]) {
    for sub in subs.iter_mut() {
        while sub.try_recv().is_ok() {}
    }
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    let reading = sample_reading();

    for subscribers in [1, 10, 100, 1000] {
        let hub = TelemetryHub::new(HubConfig::default());
        let mut subs: Vec<_> = (0..subscribers).map(|_| hub.connect()).collect();

        group.throughput(Throughput::Elements(subscribers as u64));

        group.bench_function(format!("fan_out_{}", subscribers), |b| {
            b.iter(|| {
                let ack = hub.ingest_via_request(black_box(reading.clone()));
                drain(&mut subs);
                ack
            })
        });
    }

    group.finish();
}

fn bench_ingest_parse(c: &mut Criterion) {
    let hub = TelemetryHub::new(HubConfig::default());
    let body = br#"{"heartRate": 72, "temperature": 36.6, "motion": false}"#;

    c.bench_function("ingest_request_body_no_subscribers", |b| {
        b.iter(|| hub.ingest_request_body(black_box(body)).unwrap())
    });
}

fn bench_connect(c: &mut Criterion) {
    let hub = TelemetryHub::new(HubConfig::default());

    c.bench_function("connect_disconnect", |b| {
        b.iter(|| {
            let sub = hub.connect();
            sub.close();
        })
    });
}

criterion_group!(benches, bench_broadcast, bench_ingest_parse, bench_connect);
criterion_main!(benches);
