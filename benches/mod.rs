use criterion::{criterion_group, criterion_main};

mod codec;
mod session;

criterion_group!(
    benches,
    codec::bench_remaining_length,
    codec::bench_parse_publish,
    session::bench_publish_qos0,
    session::bench_poll_inbound
);
criterion_main!(benches);
