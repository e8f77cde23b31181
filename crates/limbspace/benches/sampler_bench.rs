//! Criterion benchmarks for rejection sampling through the simulated chain.
//!
//! The hull comes from FK images of random configurations, so the acceptance
//! rate is whatever the chain's reach gives; worker counts show scaling.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use limbspace::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn recorded_hull(chain: &SerialChain, limits: &JointLimits) -> WorkspaceHull {
    let mut rng = StdRng::seed_from_u64(5);
    let positions: Vec<_> = (0..40)
        .map(|_| {
            let unit = Configuration::from_fn(|_, _| rng.gen::<f64>());
            chain.forward(&limits.scale(&unit)).position
        })
        .collect();
    WorkspaceHull::build(&positions).unwrap()
}

fn bench_sample_n(c: &mut Criterion) {
    let limits = JointLimits::baxter(Arm::Left);
    let chain = SerialChain::baxter_like(Arm::Left);
    let hull = recorded_hull(&chain, &limits);
    let session = Session::new();
    let mut group = c.benchmark_group("sample_n_100");
    for &workers in &[1usize, 2, 4] {
        let params = SamplerParams {
            workers,
            ..SamplerParams::default()
        };
        let sampler = RejectionSampler::new(params, 17).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| sampler.sample_n(100, &limits, &chain, &hull, &session).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sample_n);
criterion_main!(benches);
