//! Acceptance-rate measurement for rejection sampling on the simulated arm.
//!
//! Purpose
//! - Give a reproducible data point for "how many draws does it take to collect
//!   the default 300 samples inside a recorded workspace?"
//!
//! Why this shape
//! - The operator is replaced by `guide` calls to random configurations, so the
//!   recorded hull covers a realistic but partial region of the reach.
//! - Sampling runs with one and four workers to show the wall-clock scaling.
//!
//! References
//! - Code: crates/limbspace/src/handler/mod.rs::PoseHandler::sample

use std::time::Instant;

use limbspace::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn main() {
    let arm = Arm::Left;
    let limits = JointLimits::baxter(arm);
    let mut robot = SimulatedRobot::new(arm);
    let mut rng = StdRng::seed_from_u64(2024);

    let mut handler = PoseHandler::new(arm, PoseTable::new(PoseKind::Euler));
    let session = Session::new();
    for _ in 0..25 {
        let unit = Configuration::from_fn(|_, _| rng.gen::<f64>());
        robot.guide(limits.scale(&unit));
        let mut input = ScriptedInput::from_keys(["y", "n"]);
        handler
            .record(&robot, &mut input, &session)
            .expect("recording on the simulated arm");
    }
    let volume = handler.hull().expect("recorded hull").volume();
    println!("recorded={} hull_volume={volume:.6}", handler.table().len());

    let chain = robot.chain().clone();
    for workers in [1usize, 4] {
        let params = SamplerParams {
            workers,
            ..SamplerParams::default()
        };
        let sampler = RejectionSampler::new(params, 1).expect("valid params");
        let start = Instant::now();
        let (table, stats) = handler
            .sample(&chain, &limits, &sampler, 300, &session)
            .expect("sampling succeeds");
        let elapsed = start.elapsed().as_secs_f64() * 1e3;
        println!(
            "workers={workers} samples={} attempts={} rate={:.4} time_ms={elapsed:.3}",
            table.len(),
            stats.attempts,
            stats.acceptance_rate()
        );
    }
}
