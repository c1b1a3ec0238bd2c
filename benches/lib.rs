use criterion::{criterion_group, criterion_main};

mod detrend;

criterion_group!(benches_detrend, detrend::bench_detrend);
criterion_main!(benches_detrend);
