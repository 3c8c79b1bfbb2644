//! Binary extraction codec benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wsrpc_protocol::{Binary, Codec, Request, RequestId, Value};

fn create_binary_request(payload_size: usize) -> Value {
    let params: Value = [
        ("sensor", Value::from("s-12345")),
        ("raw", Binary::from(Bytes::from(vec![0x42u8; payload_size])).into()),
        (
            "samples",
            Binary::from(vec![1.5f32; payload_size / 4]).into(),
        ),
    ]
    .into_iter()
    .collect();
    Request::new(RequestId(1), "sensor.write")
        .with_params(params)
        .into_value()
}

fn create_nested_request(entries: usize) -> Value {
    let readings: Vec<Value> = (0..entries)
        .map(|i| {
            [
                ("seq", Value::from(i as i64)),
                ("window", Binary::from(vec![i as u16; 8]).into()),
            ]
            .into_iter()
            .collect()
        })
        .collect();
    let params: Value = [("readings", Value::Array(readings))].into_iter().collect();
    Request::new(RequestId(1), "sensor.batch")
        .with_params(params)
        .into_value()
}

fn bench_encode_binary(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_binary");
    let codec = Codec::default();

    for size in [100, 1000, 10000, 100000] {
        let message = create_binary_request(size);

        group.throughput(Throughput::Bytes(size as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &message, |b, message| {
            b.iter(|| black_box(codec.encode(message).unwrap()));
        });
    }

    group.finish();
}

fn bench_decode_binary(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_binary");
    let codec = Codec::default();

    for size in [100, 1000, 10000, 100000] {
        let parts = codec.encode(&create_binary_request(size)).unwrap();

        group.throughput(Throughput::Bytes(size as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &parts, |b, parts| {
            b.iter(|| black_box(codec.decode(&parts.envelope, &parts.binaries).unwrap()));
        });
    }

    group.finish();
}

fn bench_encode_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_nested");
    let codec = Codec::default();

    for entries in [10, 100, 1000] {
        let message = create_nested_request(entries);

        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entries),
            &message,
            |b, message| {
                b.iter(|| black_box(codec.encode(message).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_decode_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_nested");
    let codec = Codec::default();

    for entries in [10, 100, 1000] {
        let parts = codec.encode(&create_nested_request(entries)).unwrap();

        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &parts, |b, parts| {
            b.iter(|| black_box(codec.decode(&parts.envelope, &parts.binaries).unwrap()));
        });
    }

    group.finish();
}

fn bench_plain_message(c: &mut Criterion) {
    let codec = Codec::default();
    let message = Request::new(RequestId(1), "ping")
        .with_params(
            [("note", Value::from("x".repeat(1000)))]
                .into_iter()
                .collect::<Value>(),
        )
        .into_value();
    let parts = codec.encode(&message).unwrap();

    c.bench_function("plain_encode", |b| {
        b.iter(|| black_box(codec.encode(&message).unwrap()))
    });
    c.bench_function("plain_decode", |b| {
        b.iter(|| black_box(codec.decode(&parts.envelope, &parts.binaries).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_encode_binary,
    bench_decode_binary,
    bench_encode_nested,
    bench_decode_nested,
    bench_plain_message,
);

criterion_main!(benches);
