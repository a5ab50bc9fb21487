//! Host-side stream seeding and dispatch planning benchmarks.
//!
//! `seed_states` runs on every `set_seed` and must stay linear in the
//! number of lanes; `plan` runs once per dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mtsweep_core::dispatch::plan;
use mtsweep_core::host::sample_lane;
use mtsweep_core::params::ParameterRecord;
use mtsweep_core::stream::seed_states;

fn bench_seed_states(c: &mut Criterion) {
    let mut group = c.benchmark_group("seed_states");

    for lane_ceiling in [256u32, 1024] {
        let lanes = lane_ceiling as u64 * 100;
        group.throughput(Throughput::Elements(lanes));
        group.bench_with_input(
            BenchmarkId::from_parameter(lane_ceiling),
            &lane_ceiling,
            |b, &ceiling| b.iter(|| black_box(seed_states(black_box(7), ceiling, 100))),
        );
    }

    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    c.bench_function("plan_1e8", |b| {
        b.iter(|| black_box(plan(black_box(100_000_000), 1024, 100)))
    });
}

fn bench_host_lane(c: &mut Criterion) {
    let record = ParameterRecord {
        matrix_a: 0x9908_B0DF,
        mask_b: 0x9D2C_5680,
        mask_c: 0xEFC6_0000,
        seed: 0,
    };
    let state = seed_states(1, 1, 1);
    let mut out = vec![0u8; 4096];

    let mut group = c.benchmark_group("host_kernel");
    group.throughput(Throughput::Elements(out.len() as u64));
    group.bench_function("sample_lane_4096", |b| {
        b.iter(|| {
            let mut slot = state.lane(0).to_vec();
            sample_lane(&record, &mut slot, &mut out);
            black_box(&out);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_seed_states, bench_plan, bench_host_lane);
criterion_main!(benches);
