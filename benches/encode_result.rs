// Result encoding benchmark - measure Event → JSON record conversion
//
// Isolates the encode hot path: plan walk, scanners, pooled value buffers
// and the direct JSON writer. Plan compilation happens once outside the loop.

use std::sync::Arc;

use chrono::DateTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lognorm::{Event, EventType, FieldDescriptor, FieldKind, LogResultBuilder, Normalizer};
use serde_json::json;

fn access_log_type() -> Arc<EventType> {
    Arc::new(EventType::new(
        "Bench.Access",
        vec![
            FieldDescriptor::timestamp("time").event_time(),
            FieldDescriptor::string("client").scan("net_addr"),
            FieldDescriptor::string("referer").scan("url"),
            FieldDescriptor::string("role").scan("aws_arn"),
            FieldDescriptor::string("trace").scan("trace_id"),
            FieldDescriptor::int("status"),
            FieldDescriptor::int("bytes"),
            FieldDescriptor::array("hashes", FieldKind::String).scan("sha256"),
        ],
    ))
}

fn sample_events(event_type: &Arc<EventType>, count: usize) -> Vec<Event> {
    let time = DateTime::parse_from_rfc3339("2024-01-15T14:30:00.123Z").unwrap();
    (0..count)
        .map(|i| {
            Event::new(Arc::clone(event_type))
                .with("time", time)
                .unwrap()
                .with("client", format!("10.0.{}.{}:443", i / 256 % 256, i % 256))
                .unwrap()
                .with("referer", format!("https://app{}.example.com/login", i % 8))
                .unwrap()
                .with("role", "arn:aws:iam::123456789012:role/bench")
                .unwrap()
                .with("trace", format!("{:032x}", i))
                .unwrap()
                .with("status", 200i64)
                .unwrap()
                .with("bytes", (i * 17) as i64)
                .unwrap()
                .with("hashes", vec![format!("{:064x}", i)])
                .unwrap()
        })
        .collect()
}

/// Benchmark encoding pre-built events
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_result");
    let normalizer = Normalizer::default();
    let event_type = access_log_type();
    let builder: LogResultBuilder = normalizer
        .result_builder("Bench.Access", &event_type)
        .unwrap();

    for count in [100usize, 1_000] {
        let events = sample_events(&event_type, count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| {
                for event in events {
                    let mut result = builder.build(event.clone());
                    black_box(normalizer.encode(&mut result).unwrap());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark decoding wire records back into events
fn bench_decode(c: &mut Criterion) {
    let normalizer = Normalizer::default();
    let event_type = access_log_type();
    let record = json!({
        "time": "2024-01-15T14:30:00.123Z",
        "client": "10.0.0.1:443",
        "referer": "https://app.example.com/login",
        "role": "arn:aws:iam::123456789012:role/bench",
        "trace": "0af7651916cd43dd8448eb211c80319c",
        "status": 200,
        "bytes": 5120,
        "hashes": ["e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"]
    });

    c.bench_function("decode_event", |b| {
        b.iter(|| black_box(normalizer.decode(&event_type, &record).unwrap()));
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
