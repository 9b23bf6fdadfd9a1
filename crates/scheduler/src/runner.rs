//! The scheduler's dedicated thread (SPEC_FULL §4.H, §5): sleeps
//! `min(idle_seconds, 5s)`, runs due jobs, and watches for SIGINT/SIGTERM.
//!
//! Generalized from `crates/rules/src/scheduler/core.rs`'s consumer (a tick
//! loop polling `RuleScheduler::due_rules`) onto the two fixed jobs this
//! pipeline has. The listener itself is not started here — the CLI's `all`
//! subcommand spawns it as its own task and passes this runner a
//! `JoinHandle` to abort on shutdown, keeping the single-threaded
//! platform-client event loop (SPEC_FULL §5) out of the scheduler thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::orchestrator::{Job, Orchestrator};

/// Runs a due job. One call per (job, due-tick); errors are logged by the
/// implementation and never propagate here — a failed run simply waits for
/// the next scheduled tick (SPEC_FULL §7: "errors ... propagate to the
/// orchestrator, which logs and continues to schedule the next tick").
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: Job);
}

/// Resolves once both SIGINT and SIGTERM are handled; on Unix this listens
/// for both, on other platforms only `ctrl_c`.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler, falling back to SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Drive the scheduler loop until a shutdown signal arrives, then cancel the
/// listener task (if any) and return.
///
/// `listener_task`, if given, is aborted on shutdown — the listener's
/// platform client is not safe for concurrent use, so the scheduler never
/// calls into it directly; it only owns the task handle's lifecycle.
pub async fn run_loop(
    mut orchestrator: Orchestrator,
    job_runner: Arc<dyn JobRunner>,
    listener_task: Option<JoinHandle<()>>,
) {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received");
            running.store(false, Ordering::SeqCst);
        });
    }

    while running.load(Ordering::SeqCst) {
        let now = Utc::now();
        let sleep_secs = orchestrator.sleep_seconds(now);
        if sleep_secs > 0 {
            tokio::time::sleep(std::time::Duration::from_secs(sleep_secs)).await;
            if !running.load(Ordering::SeqCst) {
                break;
            }
        }

        let now = Utc::now();
        for job in orchestrator.due_jobs(now) {
            job_runner.run(job).await;
            orchestrator.record_trigger(job, now);
        }
    }

    if let Some(task) = listener_task {
        task.abort();
    }
    info!("scheduler loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingRunner {
        processor_runs: AtomicUsize,
        status_runs: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl JobRunner for CountingRunner {
        async fn run(&self, job: Job) {
            match job {
                Job::Processor => {
                    self.processor_runs.fetch_add(1, Ordering::SeqCst);
                }
                Job::StatusReporter => {
                    self.status_runs.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overdue_jobs_run_immediately_without_sleeping_past_cap() {
        let orchestrator = Orchestrator::new("00:00", "UTC", 1440).unwrap();
        let runner = Arc::new(CountingRunner {
            processor_runs: AtomicUsize::new(0),
            status_runs: AtomicUsize::new(0),
        });

        // Both jobs are overdue on a freshly constructed orchestrator (never
        // triggered), so the first loop iteration should run them without
        // waiting out a full day or a full interval period.
        let now = Utc::now();
        let due = orchestrator.due_jobs(now);
        assert_eq!(due.len(), 2);
        for job in due {
            runner.run(job).await;
        }
        assert_eq!(runner.processor_runs.load(Ordering::SeqCst), 1);
        assert_eq!(runner.status_runs.load(Ordering::SeqCst), 1);
    }
}
