// LTM Gateway - Shutdown Coordinator
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// SIGINT/SIGTERM (and stdin EOF) force one last lifecycle transition: if the
// session is awake, run sleep() so the dreamstate pass is not lost. Best
// effort, at most once per process, bounded wait. Failures are logged only;
// the process exits regardless.

use crate::session::Session;
use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Was awake; sleep() produced this update
    Slept { update_id: String },
    NotAwake,
    Failed(String),
    /// Session lock not available within the bounded wait
    TimedOut,
    /// Another trigger already ran the flush
    AlreadyFlushed,
}

pub struct ShutdownCoordinator {
    session: Arc<Session>,
    timeout: Duration,
    fired: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(session: Arc<Session>, timeout: Duration) -> Self {
        Self {
            session,
            timeout,
            fired: AtomicBool::new(false),
        }
    }

    /// Final flush. Only the first caller does any work.
    pub fn flush(&self) -> ShutdownOutcome {
        if self.fired.swap(true, Ordering::SeqCst) {
            return ShutdownOutcome::AlreadyFlushed;
        }

        let outcome = match self.session.sleep_if_awake(self.timeout) {
            None => ShutdownOutcome::TimedOut,
            Some(Ok(None)) => ShutdownOutcome::NotAwake,
            Some(Ok(Some(update))) => ShutdownOutcome::Slept { update_id: update.update_id },
            Some(Err(e)) => ShutdownOutcome::Failed(e.to_string()),
        };

        match &outcome {
            ShutdownOutcome::Slept { update_id } => {
                log::info!("Shutdown: dreamstate flushed as update {}", update_id)
            }
            ShutdownOutcome::NotAwake => log::info!("Shutdown: not awake, nothing to flush"),
            ShutdownOutcome::Failed(msg) => log::error!("Shutdown: final sleep failed: {}", msg),
            ShutdownOutcome::TimedOut => log::error!(
                "Shutdown: session busy for {:?}, skipping final sleep",
                self.timeout
            ),
            ShutdownOutcome::AlreadyFlushed => {}
        }
        outcome
    }

    /// Spawn the signal thread. On SIGINT/SIGTERM: flush, release stdout,
    /// exit(0).
    pub fn install(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;

        let handle = std::thread::Builder::new()
            .name("ltm-shutdown".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    log::info!("Received signal {}, shutting down", sig);
                    self.flush();
                    let _ = std::io::stdout().flush();
                    std::process::exit(0);
                }
            })
            .context("Failed to spawn shutdown thread")?;

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::FakeEngine;
    use crate::model::{AwakenOptions, SearchOptions};

    fn coordinator(awake: bool) -> (ShutdownCoordinator, Arc<parking_lot::Mutex<crate::engine::testing::FakeState>>) {
        let (engine, state) = FakeEngine::new();
        let session = Arc::new(Session::new(Box::new(engine)));
        session.initialize().unwrap();
        if awake {
            session.awaken(AwakenOptions::default()).unwrap();
        }
        (ShutdownCoordinator::new(session, Duration::from_millis(200)), state)
    }

    #[test]
    fn awake_triggers_exactly_one_sleep() {
        let (coord, state) = coordinator(true);
        assert_eq!(coord.flush(), ShutdownOutcome::Slept { update_id: "upd_1".into() });
        assert_eq!(coord.flush(), ShutdownOutcome::AlreadyFlushed);
        assert_eq!(state.lock().sleep_calls, 1);
    }

    #[test]
    fn asleep_triggers_no_sleep() {
        let (coord, state) = coordinator(false);
        assert_eq!(coord.flush(), ShutdownOutcome::NotAwake);
        assert_eq!(state.lock().sleep_calls, 0);
    }

    #[test]
    fn failure_is_reported_not_retried() {
        let (coord, state) = coordinator(true);
        state.lock().fail_sleep = true;
        assert_eq!(coord.flush(), ShutdownOutcome::Failed("dreamstate exploded".into()));
        assert_eq!(coord.flush(), ShutdownOutcome::AlreadyFlushed);
        assert_eq!(state.lock().sleep_calls, 1);
    }

    #[test]
    fn busy_session_times_out() {
        let (engine, state) = FakeEngine::new();
        state.lock().stall_search = Some(Duration::from_millis(500));
        let session = Arc::new(Session::new(Box::new(engine)));
        session.initialize().unwrap();
        session.awaken(AwakenOptions::default()).unwrap();

        let busy = session.clone();
        let worker = std::thread::spawn(move || busy.search_memories("x", &[], SearchOptions::default()));
        std::thread::sleep(Duration::from_millis(100));

        let coord = ShutdownCoordinator::new(session, Duration::from_millis(20));
        assert_eq!(coord.flush(), ShutdownOutcome::TimedOut);
        worker.join().unwrap().unwrap();
    }
}
