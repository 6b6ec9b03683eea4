use criterion::{black_box, criterion_group, criterion_main, Criterion};

use jittermark::{CycleTimestamps, JitterGeometry, JitterSampler};

fn bench_record_cycle(c: &mut Criterion) {
    let mut sampler = JitterSampler::new();
    sampler.begin_run(JitterGeometry::default()).unwrap();
    let mut scheduled = 0u64;

    c.bench_function("record_cycle", |b| {
        b.iter(|| {
            scheduled += 2_000_000;
            let ts = CycleTimestamps {
                scheduled,
                wakeup: scheduled + 35_000,
                rendered: scheduled + 410_000,
                delivered: scheduled + 430_000,
            };
            black_box(sampler.record_cycle(black_box(&ts)))
        })
    });

    c.bench_function("record_saturating", |b| {
        b.iter(|| black_box(sampler.record_delivery(black_box(u64::MAX))))
    });
}

criterion_group!(benches, bench_record_cycle);
criterion_main!(benches);
