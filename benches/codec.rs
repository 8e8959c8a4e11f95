use criterion::{Criterion, Throughput};
use libiot_mqtt::network::application::mqtt::Publish;
use libiot_mqtt::network::application::mqtt::codec;
use std::hint::black_box;

pub fn bench_remaining_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("remaining_length");
    group.bench_function("encode", |b| {
        let mut out = [0u8; 4];
        b.iter(|| codec::encode_remaining_length(black_box(16_000), &mut out))
    });
    group.bench_function("decode", |b| {
        b.iter(|| codec::decode_remaining_length(black_box(&[0xFF, 0x7F])))
    });
    group.finish();
}

pub fn bench_parse_publish(c: &mut Criterion) {
    let payload = [0xA5u8; 512];
    let mut vh = heapless::Vec::<u8, 64>::new();
    codec::encode_publish_header(&mut vh, "sensors/temperature", Some(42)).unwrap();
    let mut packet = [0u8; 600];
    let len = codec::encode_packet(&mut packet, 0x32, &[vh.as_slice(), &payload]).unwrap();

    let mut group = c.benchmark_group("publish");
    group.throughput(Throughput::Bytes(len as u64));
    group.bench_function("parse", |b| {
        b.iter(|| Publish::parse(black_box(&packet[..len])))
    });
    group.finish();
}
