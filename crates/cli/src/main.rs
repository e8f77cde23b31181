use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use limbspace::prelude::*;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;
mod shutdown;

/// How often the record prompt re-checks the session while waiting for input.
const ANSWER_POLL: Duration = Duration::from_millis(100);

/// Operator answers, one per line; the sender hangs up at end of input.
type Answers = Receiver<std::io::Result<String>>;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Record, replay and sample arm workspaces")]
struct Cmd {
    /// Arm to operate on: left or right
    #[arg(long, default_value = "left")]
    arm: Arm,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Record poses on the simulated arm, answering y/n on stdin
    Record {
        #[arg(long, default_value = "data")]
        dir: PathBuf,
        /// Seed for the jogged arm positions
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Sample configurations inside the recorded workspace
    Sample {
        #[arg(long, default_value = "data")]
        dir: PathBuf,
        #[arg(long, default_value_t = 300)]
        samples: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        max_attempts: Option<u64>,
        #[arg(long)]
        timeout_secs: Option<f64>,
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
    /// Print the recorded row closest to a pose (6 or 7 values)
    Nearest {
        #[arg(long, default_value = "data")]
        dir: PathBuf,
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// Dry-run replay of the recorded table
    Replay {
        #[arg(long, default_value = "data")]
        dir: PathBuf,
    },
    /// Log table shapes and hull statistics
    Inspect {
        #[arg(long, default_value = "data")]
        dir: PathBuf,
        /// File suffix: empty for recorded tables, "2" for sampled ones
        #[arg(long, default_value = "")]
        suffix: String,
    },
    /// Print a provenance JSON block
    Report {
        /// Artifact whose sidecar to print
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    let arm = cmd.arm;
    let session = Session::new();
    shutdown::install(session.clone())?;
    match cmd.action {
        Action::Record { dir, seed } => {
            record(arm, &dir, seed, &stdin_answers(), &session).map(|_| ())
        }
        Action::Sample {
            dir,
            samples,
            seed,
            max_attempts,
            timeout_secs,
            workers,
        } => sample(
            arm,
            &dir,
            &session,
            SampleArgs {
                samples,
                seed,
                max_attempts,
                timeout_secs,
                workers,
            },
        ),
        Action::Nearest { dir, values } => nearest(arm, &dir, &values, &session),
        Action::Replay { dir } => replay(arm, &dir, &session),
        Action::Inspect { dir, suffix } => inspect(&dir, &suffix),
        Action::Report { artifact } => report(artifact.as_deref()),
    }
}

/// Stdin lines on a channel, so the record prompt can poll the session.
fn stdin_answers() -> Answers {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Open the recorded table in `dir`, recording one first when it is missing.
fn open_recorded(arm: Arm, dir: &Path, session: &Session) -> Result<PoseHandler> {
    open_or_record(arm, dir, session, stdin_answers)
}

fn open_or_record(
    arm: Arm,
    dir: &Path,
    session: &Session,
    answers: impl FnOnce() -> Answers,
) -> Result<PoseHandler> {
    let (poses, configs) = table_file_names("");
    let (poses, configs) = (dir.join(poses), dir.join(configs));
    match PoseHandler::open(arm, &poses, &configs) {
        Err(WorkspaceError::Io { path, source }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(missing = %path.display(), "no recorded table, recording one now");
            let table = record(arm, dir, 0, &answers(), session)?;
            Ok(PoseHandler::new(arm, table))
        }
        opened => opened.with_context(|| format!("opening the recorded table in {}", dir.display())),
    }
}

/// Jog the simulated arm and ask before each capture. Stops on `n`, end of
/// input or session shutdown, and saves whatever was recorded.
fn record(arm: Arm, dir: &Path, seed: u64, answers: &Answers, session: &Session) -> Result<PoseTable> {
    let limits = JointLimits::baxter(arm);
    let mut robot = SimulatedRobot::new(arm);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut recorder = Recorder::new(arm);
    recorder.handle(OperatorCommand::Start, &robot)?;

    'prompt: while recorder.state() != RecorderState::Stopped {
        let unit = Configuration::from_fn(|_, _| rng.gen::<f64>());
        robot.guide(limits.scale(&unit));
        print!("Record current {arm} arm pose? (y/n): ");
        std::io::stdout().flush()?;
        let command = loop {
            if session.is_shutdown() {
                tracing::warn!(recorded = recorder.table().len(), "recording interrupted");
                break 'prompt;
            }
            match answers.recv_timeout(ANSWER_POLL) {
                Ok(line) => break OperatorCommand::from_key(&line?),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break Some(OperatorCommand::Stop),
            }
        };
        match command {
            Some(command) => {
                recorder.handle(command, &robot)?;
            }
            None => tracing::warn!("answer y to record or n to stop"),
        }
    }

    let table = recorder.finish();
    let names = limits.short_names();
    let (poses, configs) = table.save_dir(dir, "", &names)?;
    tracing::info!(
        rows = table.len(),
        poses = %poses.display(),
        configurations = %configs.display(),
        "recording saved"
    );
    Ok(table)
}

struct SampleArgs {
    samples: usize,
    seed: u64,
    max_attempts: Option<u64>,
    timeout_secs: Option<f64>,
    workers: usize,
}

#[derive(Serialize)]
struct SampleProvenance<'a> {
    arm: &'a str,
    source: String,
    samples: usize,
    seed: u64,
    max_attempts: Option<u64>,
    timeout_secs: Option<f64>,
    workers: usize,
    attempts: u64,
    acceptance_rate: f64,
}

fn sample(arm: Arm, dir: &Path, session: &Session, args: SampleArgs) -> Result<()> {
    let timeout = match args.timeout_secs {
        Some(secs) if !(secs > 0.0 && secs.is_finite()) => {
            bail!("--timeout-secs must be positive, got {secs}")
        }
        Some(secs) => Some(Duration::from_secs_f64(secs)),
        None => None,
    };
    let params = SamplerParams {
        max_attempts: args.max_attempts,
        timeout,
        workers: args.workers,
    };
    let sampler = RejectionSampler::new(params, args.seed)?;
    let limits = JointLimits::baxter(arm);
    let chain = SerialChain::baxter_like(arm);

    let mut handler = open_recorded(arm, dir, session)?;
    let (table, stats) = handler
        .sample(&chain, &limits, &sampler, args.samples, session)
        .context("sampling the recorded workspace")?;

    let (poses, configs) = table.save_dir(dir, "2", &limits.short_names())?;
    let sidecar = provenance::write_sidecar(
        &[poses.clone(), configs],
        &SampleProvenance {
            arm: arm.name(),
            source: dir.display().to_string(),
            samples: args.samples,
            seed: args.seed,
            max_attempts: args.max_attempts,
            timeout_secs: args.timeout_secs,
            workers: args.workers,
            attempts: stats.attempts,
            acceptance_rate: stats.acceptance_rate(),
        },
    )?;
    tracing::info!(
        accepted = stats.accepted,
        attempts = stats.attempts,
        poses = %poses.display(),
        provenance = %sidecar.display(),
        "samples saved"
    );
    Ok(())
}

fn nearest(arm: Arm, dir: &Path, values: &[f64], session: &Session) -> Result<()> {
    let handler = open_recorded(arm, dir, session)?;
    let query = Pose::from_row(values)?;
    let (index, pose, q) = handler.closest_pose(&query)?;
    println!("index: {index}");
    println!("pose: {:?}", pose.to_row());
    println!("configuration: {:?}", q.as_slice());
    Ok(())
}

fn replay(arm: Arm, dir: &Path, session: &Session) -> Result<()> {
    let handler = open_recorded(arm, dir, session)?;
    let mut fixture = RecordedFixture::new(arm, handler.table().clone())?;
    let report = handler.replay(&mut fixture, session)?;
    for (index, reason) in &report.failed {
        tracing::warn!(index, reason = %reason, "row not reachable");
    }
    tracing::info!(
        visited = report.visited.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "replay dry run done"
    );
    Ok(())
}

/// Rows and columns of a table file as polars reads it; `(0, 0)` without rows.
fn frame_shape(path: &Path) -> Result<(usize, usize)> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let comments = text.lines().take_while(|l| l.trim_start().starts_with('#')).count();
    if text.lines().skip(comments).all(|l| l.trim().is_empty()) {
        return Ok((0, 0));
    }
    let df = LazyCsvReader::new(path)
        .with_has_header(false)
        .with_skip_rows(comments)
        .with_infer_schema_length(Some(100))
        .finish()?
        .collect()?;
    Ok(df.shape())
}

fn inspect(dir: &Path, suffix: &str) -> Result<()> {
    let (poses_name, configs_name) = table_file_names(suffix);
    let poses = dir.join(poses_name);
    let configs = dir.join(configs_name);
    for path in [&poses, &configs] {
        let (rows, cols) = frame_shape(path)?;
        tracing::info!(file = %path.display(), rows, cols, "table_shape");
    }

    let table = PoseTable::load(&poses, &configs)?;
    if table.is_empty() {
        bail!("{} has no rows; nothing to build a hull from", poses.display());
    }
    let hull = WorkspaceHull::build(&table.positions())?;
    let (lower, upper) = hull.bounds();
    tracing::info!(
        kind = ?table.kind(),
        vertices = hull.vertices().len(),
        facets = hull.facets().len(),
        simplices = hull.simplices().len(),
        volume = hull.volume(),
        lower = ?lower.as_slice(),
        upper = ?upper.as_slice(),
        "hull_stats"
    );
    Ok(())
}

fn report(artifact: Option<&Path>) -> Result<()> {
    let doc = match artifact {
        Some(path) => provenance::Provenance::read(&provenance::provenance_path(path))?,
        None => provenance::Provenance::current(serde_json::json!({
            "limbspace": limbspace::VERSION,
        })),
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
