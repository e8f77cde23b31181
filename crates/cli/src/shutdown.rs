//! Ctrl-C wiring for the CLI session.
//!
//! The first interrupt asks running actions to stop at their next safe point
//! (recording saves its partial table, sampling and replay end early). A second
//! interrupt exits immediately with status 130.

use anyhow::{Context, Result};
use limbspace::prelude::Session;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    Stop,
    Abort,
}

fn escalate(session: &Session) -> Interrupt {
    if session.is_shutdown() {
        Interrupt::Abort
    } else {
        session.request_shutdown();
        Interrupt::Stop
    }
}

/// Watch for Ctrl-C on a background thread and forward it to `session`.
pub fn install(session: Session) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the signal runtime")?;
    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || runtime.block_on(watch(session)))
        .context("spawning the signal thread")?;
    Ok(())
}

async fn watch(session: Session) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match escalate(&session) {
            Interrupt::Stop => tracing::warn!("interrupt received, stopping (Ctrl-C again to abort)"),
            Interrupt::Abort => {
                tracing::warn!("second interrupt, aborting");
                std::process::exit(130);
            }
        }
    }
    tracing::warn!("Ctrl-C handler unavailable");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_interrupt_aborts() {
        let session = Session::new();
        let seen_by_action = session.clone();
        assert_eq!(escalate(&session), Interrupt::Stop);
        assert!(seen_by_action.is_shutdown());
        assert_eq!(escalate(&session), Interrupt::Abort);
    }
}
