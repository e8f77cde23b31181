//! Rejection sampling of joint configurations inside the recorded workspace.
//!
//! Model
//! - Draw seven independent uniforms in `[0, 1)`, scale each to its joint range
//!   (`u * (max - min) + min`), map through forward kinematics, and accept iff
//!   the resulting position lies in the workspace hull.
//! - Rejections (`OutOfWorkspace`) are expected and retried silently.
//!
//! Budget
//! - The acceptance rate alone decides the cost, so `SamplerParams` carries an
//!   optional attempt cap and wall-clock timeout. Without either, the loop runs
//!   until `n` samples are accepted or the session shuts down.
//!
//! Determinism
//! - Each worker owns a `StdRng` seeded from `(seed, worker)` with the same
//!   SplitMix-style mixing as the polygon replay tokens. Worker `w` produces a
//!   fixed quota and results are concatenated in worker order, so output is a
//!   function of `(seed, workers, n)` as long as no budget is hit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::WorkspaceError;
use crate::geom3::{Configuration, Pose, WorkspaceHull};
use crate::limits::JointLimits;
use crate::robot::ForwardKinematics;
use crate::session::Session;

/// Sampling budget and parallelism.
#[derive(Clone, Debug)]
pub struct SamplerParams {
    /// Total draws allowed across all workers; `None` is unbounded.
    pub max_attempts: Option<u64>,
    pub timeout: Option<Duration>,
    pub workers: usize,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            max_attempts: None,
            timeout: None,
            workers: 1,
        }
    }
}

impl SamplerParams {
    fn validate(&self) -> Result<(), WorkspaceError> {
        if self.workers == 0 {
            return Err(WorkspaceError::invalid("workers must be > 0"));
        }
        if self.max_attempts == Some(0) {
            return Err(WorkspaceError::invalid("max_attempts must be > 0 when set"));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(WorkspaceError::invalid("timeout must be positive when set"));
        }
        Ok(())
    }
}

/// Draw counters of one `sample_n` run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub attempts: u64,
    pub accepted: usize,
}

impl SampleStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempts as f64
        }
    }
}

/// One draw: uniform configuration within `limits`, kept iff its FK position is
/// inside `hull`.
pub fn sample_one<R, K>(
    rng: &mut R,
    limits: &JointLimits,
    fk: &K,
    hull: &WorkspaceHull,
) -> Result<(Pose, Configuration), WorkspaceError>
where
    R: Rng,
    K: ForwardKinematics + ?Sized,
{
    let unit = Configuration::from_fn(|_, _| rng.gen::<f64>());
    let q = limits.scale(&unit);
    let pose = fk.forward(&q);
    if hull.contains(pose.position) {
        Ok((pose, q))
    } else {
        Err(WorkspaceError::OutOfWorkspace)
    }
}

/// Seeded rejection sampler.
#[derive(Clone, Debug)]
pub struct RejectionSampler {
    params: SamplerParams,
    seed: u64,
}

enum Halt {
    Cancelled,
    Timeout,
    RetryLimit,
}

struct WorkerRun {
    samples: Vec<(Pose, Configuration)>,
    halt: Option<Halt>,
}

impl RejectionSampler {
    pub fn new(params: SamplerParams, seed: u64) -> Result<Self, WorkspaceError> {
        params.validate()?;
        Ok(Self { params, seed })
    }

    pub fn params(&self) -> &SamplerParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Collect exactly `n` accepted samples.
    ///
    /// Errors: `RetryLimit` / `Timeout` when the budget runs out, `Cancelled`
    /// when `session` shuts down; partial results are dropped.
    pub fn sample_n<K>(
        &self,
        n: usize,
        limits: &JointLimits,
        fk: &K,
        hull: &WorkspaceHull,
        session: &Session,
    ) -> Result<(Vec<(Pose, Configuration)>, SampleStats), WorkspaceError>
    where
        K: ForwardKinematics + Sync + ?Sized,
    {
        let started = Instant::now();
        let attempts = AtomicU64::new(0);
        let stop = AtomicBool::new(false);
        let workers = self.params.workers.min(n.max(1));

        let runs: Vec<WorkerRun> = if workers == 1 {
            vec![self.run_worker(0, n, limits, fk, hull, session, started, &attempts, &stop)]
        } else {
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|w| {
                        let quota = n / workers + usize::from(w < n % workers);
                        let attempts = &attempts;
                        let stop = &stop;
                        scope.spawn(move || {
                            self.run_worker(
                                w, quota, limits, fk, hull, session, started, attempts, stop,
                            )
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(run) => run,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        };

        let stats = SampleStats {
            attempts: attempts.load(Ordering::Relaxed),
            accepted: runs.iter().map(|r| r.samples.len()).sum(),
        };
        let mut halted = runs.iter().filter_map(|r| r.halt.as_ref()).collect::<Vec<_>>();
        halted.sort_by_key(|h| match h {
            Halt::Cancelled => 0,
            Halt::Timeout => 1,
            Halt::RetryLimit => 2,
        });
        if let Some(halt) = halted.first() {
            tracing::warn!(
                accepted = stats.accepted,
                attempts = stats.attempts,
                wanted = n,
                "workspace sampling stopped early"
            );
            return Err(match halt {
                Halt::Cancelled => WorkspaceError::Cancelled,
                Halt::Timeout => WorkspaceError::Timeout {
                    accepted: stats.accepted,
                    attempts: stats.attempts,
                },
                Halt::RetryLimit => WorkspaceError::RetryLimit {
                    accepted: stats.accepted,
                    attempts: stats.attempts,
                },
            });
        }

        tracing::info!(
            accepted = stats.accepted,
            attempts = stats.attempts,
            rate = stats.acceptance_rate(),
            workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "workspace sampling finished"
        );
        let samples = runs.into_iter().flat_map(|r| r.samples).collect();
        Ok((samples, stats))
    }

    #[allow(clippy::too_many_arguments)]
    fn run_worker<K>(
        &self,
        worker: usize,
        quota: usize,
        limits: &JointLimits,
        fk: &K,
        hull: &WorkspaceHull,
        session: &Session,
        started: Instant,
        attempts: &AtomicU64,
        stop: &AtomicBool,
    ) -> WorkerRun
    where
        K: ForwardKinematics + ?Sized,
    {
        let mut rng = worker_rng(self.seed, worker as u64);
        let mut samples = Vec::with_capacity(quota);
        let halt = loop {
            if samples.len() >= quota {
                break None;
            }
            if stop.load(Ordering::Relaxed) {
                // Another worker halted; it reports the reason.
                break None;
            }
            if session.is_shutdown() {
                break Some(Halt::Cancelled);
            }
            if let Some(limit) = self.params.timeout {
                if started.elapsed() >= limit {
                    break Some(Halt::Timeout);
                }
            }
            let drawn = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(max) = self.params.max_attempts {
                if drawn > max {
                    attempts.fetch_sub(1, Ordering::Relaxed);
                    break Some(Halt::RetryLimit);
                }
            }
            if let Ok(sample) = sample_one(&mut rng, limits, fk, hull) {
                samples.push(sample);
            }
        };
        if halt.is_some() {
            stop.store(true, Ordering::Relaxed);
        }
        tracing::debug!(worker, accepted = samples.len(), quota, "sampler worker done");
        WorkerRun { samples, halt }
    }
}

/// SplitMix64-style mix of `(seed, worker)` into an independent stream.
fn worker_rng(seed: u64, worker: u64) -> StdRng {
    fn mix(mut x: u64) -> u64 {
        x ^= x >> 30;
        x = x.wrapping_mul(0xbf58476d1ce4e5b9);
        x ^= x >> 27;
        x = x.wrapping_mul(0x94d049bb133111eb);
        x ^ (x >> 31)
    }
    StdRng::seed_from_u64(mix(seed ^ mix(worker.wrapping_add(0x9e3779b97f4a7c15))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom3::PoseKind;
    use nalgebra::{vector, Vector3, Vector4};
    use proptest::prelude::*;

    fn cube(lo: f64, hi: f64) -> WorkspaceHull {
        let mut pts = Vec::new();
        for x in [lo, hi] {
            for y in [lo, hi] {
                for z in [lo, hi] {
                    pts.push(vector![x, y, z]);
                }
            }
        }
        WorkspaceHull::build(&pts).unwrap()
    }

    /// Position = first three joints, identity orientation.
    fn first_three(q: &Configuration) -> Pose {
        Pose::quaternion(Vector3::new(q[0], q[1], q[2]), Vector4::new(0.0, 0.0, 0.0, 1.0))
    }

    #[test]
    fn full_box_hull_accepts_every_draw_reproducibly() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(-1.0, 1.0);
        let sampler = RejectionSampler::new(SamplerParams::default(), 42).unwrap();
        let session = Session::new();
        let (a, stats) = sampler.sample_n(5, &limits, &first_three, &hull, &session).unwrap();
        assert_eq!(a.len(), 5);
        assert_eq!(stats, SampleStats { attempts: 5, accepted: 5 });
        let (b, _) = sampler.sample_n(5, &limits, &first_three, &hull, &session).unwrap();
        assert_eq!(a, b);
        let other = RejectionSampler::new(SamplerParams::default(), 43).unwrap();
        let (c, _) = other.sample_n(5, &limits, &first_three, &hull, &session).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn small_hull_rejects_and_retries() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(-0.5, 0.5);
        let sampler = RejectionSampler::new(SamplerParams::default(), 3).unwrap();
        let (samples, stats) = sampler
            .sample_n(20, &limits, &first_three, &hull, &Session::new())
            .unwrap();
        assert_eq!(samples.len(), 20);
        // Acceptance probability is 1/8.
        assert!(stats.attempts > 20);
        for (pose, q) in &samples {
            assert!(hull.contains(pose.position));
            assert!(limits.contains(q));
            assert_eq!(pose.kind(), PoseKind::Quaternion);
        }
    }

    #[test]
    fn unreachable_workspace_hits_retry_limit() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(5.0, 6.0);
        let params = SamplerParams {
            max_attempts: Some(200),
            ..SamplerParams::default()
        };
        let sampler = RejectionSampler::new(params, 1).unwrap();
        match sampler.sample_n(3, &limits, &first_three, &hull, &Session::new()) {
            Err(WorkspaceError::RetryLimit { accepted, attempts }) => {
                assert_eq!(accepted, 0);
                assert_eq!(attempts, 200);
            }
            other => panic!("expected retry limit, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_workspace_times_out() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(5.0, 6.0);
        let params = SamplerParams {
            timeout: Some(Duration::from_millis(20)),
            workers: 2,
            ..SamplerParams::default()
        };
        let sampler = RejectionSampler::new(params, 1).unwrap();
        assert!(matches!(
            sampler.sample_n(3, &limits, &first_three, &hull, &Session::new()),
            Err(WorkspaceError::Timeout { accepted: 0, .. })
        ));
    }

    #[test]
    fn shutdown_cancels_sampling() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(-1.0, 1.0);
        let session = Session::new();
        session.request_shutdown();
        let sampler = RejectionSampler::new(SamplerParams::default(), 9).unwrap();
        assert!(matches!(
            sampler.sample_n(3, &limits, &first_three, &hull, &session),
            Err(WorkspaceError::Cancelled)
        ));
    }

    #[test]
    fn parallel_workers_fill_exact_count_deterministically() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(-0.7, 0.7);
        let params = SamplerParams {
            workers: 4,
            ..SamplerParams::default()
        };
        let sampler = RejectionSampler::new(params, 11).unwrap();
        let (a, stats) = sampler
            .sample_n(30, &limits, &first_three, &hull, &Session::new())
            .unwrap();
        assert_eq!(a.len(), 30);
        assert_eq!(stats.accepted, 30);
        let (b, _) = sampler
            .sample_n(30, &limits, &first_three, &hull, &Session::new())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_samples_is_trivial() {
        let limits = JointLimits::uniform(-1.0, 1.0).unwrap();
        let hull = cube(5.0, 6.0);
        let sampler = RejectionSampler::new(SamplerParams::default(), 0).unwrap();
        let (s, stats) = sampler
            .sample_n(0, &limits, &first_three, &hull, &Session::new())
            .unwrap();
        assert!(s.is_empty());
        assert_eq!(stats.attempts, 0);
    }

    #[test]
    fn invalid_params_are_rejected() {
        for params in [
            SamplerParams {
                workers: 0,
                ..SamplerParams::default()
            },
            SamplerParams {
                max_attempts: Some(0),
                ..SamplerParams::default()
            },
        ] {
            assert!(matches!(
                RejectionSampler::new(params, 0),
                Err(WorkspaceError::InvalidParams { .. })
            ));
        }
    }

    proptest! {
        #[test]
        fn sample_one_respects_limits_and_hull(seed in any::<u64>(), lo in -2.0f64..0.0, span in 0.1f64..3.0) {
            let limits = JointLimits::uniform(lo, lo + span).unwrap();
            let hull = cube(-0.5, 0.5);
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..50 {
                match sample_one(&mut rng, &limits, &first_three, &hull) {
                    Ok((pose, q)) => {
                        prop_assert!(limits.contains(&q));
                        prop_assert!(hull.contains(pose.position));
                    }
                    Err(e) => prop_assert!(matches!(e, WorkspaceError::OutOfWorkspace)),
                }
            }
        }
    }
}
