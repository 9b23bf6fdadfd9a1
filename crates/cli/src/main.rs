mod app;
mod auth;
mod cli;
mod health;
mod listener_cmd;
mod moderation_transport;
mod processor;
mod runner;
mod status;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use crate::app::{AppContext, AppError};
use crate::cli::{Cli, Command};
use crate::health::HealthChecker;
use crate::runner::PipelineJobRunner;

/// Exit codes (SPEC_FULL §6): 0 success, 1 recoverable failure, 2
/// unrecoverable (validation error, not authorized). `main` itself only
/// ever returns via [`std::process::exit`] so every path, including the
/// startup-failure one, reports through this taxonomy rather than libstd's
/// blanket "exit 1 on Err" for a `fn main() -> Result<_>`.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::All);

    let ctx = match AppContext::load().await {
        Ok(ctx) => ctx,
        Err(err) => {
            error!(error = %err, "failed to initialize pipeline context");
            std::process::exit(err.exit_code());
        }
    };
    info!(profile = %ctx.profile, "pulse-cli starting");

    let exit_code = run_command(command, ctx).await;
    std::process::exit(exit_code);
}

async fn run_command(command: Command, ctx: AppContext) -> i32 {
    match command {
        Command::Listener => match listener_cmd::run_listener(&ctx).await {
            Ok(()) => 0,
            Err(err) => {
                error!(error = %err, "listener exited with an error");
                listener_exit_code(&err)
            }
        },
        Command::Processor => match processor::run_processor(&ctx).await {
            Ok(()) => 0,
            Err(err) => {
                error!(error = %err, "processor run failed");
                err.exit_code()
            }
        },
        Command::All => run_all(ctx).await,
        Command::Auth => match auth::run_auth(&ctx).await {
            Ok(()) => 0,
            Err(err) => {
                error!(error = %err, "authentication failed");
                err.exit_code()
            }
        },
        Command::SendStatus { profile: _ } => match status::send_status(&ctx).await {
            Ok(()) => 0,
            Err(err) => {
                error!(error = %err, "failed to send status report");
                err.exit_code()
            }
        },
        Command::CheckHealth { json, quiet } => run_check_health(&ctx, json, quiet).await,
        Command::RunHealthcheckServer { host, port } => {
            let checker = HealthChecker::from_context(&ctx);
            match health::serve(checker, &host, port).await.context("healthcheck server failed") {
                Ok(()) => 0,
                Err(err) => {
                    error!(error = %err, "healthcheck server failed");
                    1
                }
            }
        }
    }
}

fn listener_exit_code(err: &pulse_listener::ListenerError) -> i32 {
    match err {
        pulse_listener::ListenerError::NotAuthorized => 2,
        _ => 1,
    }
}

/// `all` (SPEC_FULL §5's "mixed" scheduling model): the listener runs on its
/// own task while the scheduler thread drives the daily processor and
/// periodic status-reporter ticks, until a shutdown signal arrives.
async fn run_all(ctx: AppContext) -> i32 {
    let listener_ctx = match AppContext::load().await {
        Ok(ctx) => ctx,
        Err(err) => {
            error!(error = %err, "failed to initialize listener context");
            return err.exit_code();
        }
    };
    let listener_task = tokio::spawn(async move {
        if let Err(err) = listener_cmd::run_listener(&listener_ctx).await {
            error!(error = %err, "listener task exited with an error");
        }
    });

    let orchestrator = match pulse_scheduler::Orchestrator::new(
        &ctx.config.processor.schedule_time,
        &ctx.config.processor.timezone,
        ctx.config.status_reporter.interval_minutes,
    ) {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            error!(error = %err, "failed to build scheduler orchestrator");
            return 2;
        }
    };

    let job_runner: Arc<dyn pulse_scheduler::JobRunner> = Arc::new(PipelineJobRunner::new(ctx));
    pulse_scheduler::run_loop(orchestrator, job_runner, Some(listener_task)).await;
    0
}

async fn run_check_health(ctx: &AppContext, json: bool, quiet: bool) -> i32 {
    let checker = HealthChecker::from_context(ctx);
    let health = checker.check_all().await;

    if json {
        match serde_json::to_string_pretty(&health) {
            Ok(body) => println!("{body}"),
            Err(err) => {
                error!(error = %err, "failed to serialize health report");
                return 1;
            }
        }
    } else if !quiet {
        health::print_report(&health);
    }

    health.status.exit_code()
}
