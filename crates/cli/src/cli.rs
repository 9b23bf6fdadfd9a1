//! Top-level argument parsing (SPEC_FULL §1, §6): `main [listener|processor|all]`
//! plus the admin subcommands `auth`, `send-status`, `check-health` and
//! `run-healthcheck-server`. Each variant is a thin wrapper dispatched in
//! `main.rs` — it holds no business logic of its own.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pulse-cli", about = "News aggregation, dedup, selection and publication pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run only the listener: observe subscribed/manual channels and persist raw messages.
    Listener,

    /// Run the daily processor once: dedup, select, moderate, publish.
    Processor,

    /// Run both the listener and the scheduler loop (default).
    All,

    /// Interactive first-time (or re-) authentication against the platform.
    Auth,

    /// Send an ad-hoc status report for the given profile.
    SendStatus {
        #[arg(long)]
        profile: String,
    },

    /// Run every health check once and print the result.
    CheckHealth {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        quiet: bool,
    },

    /// Serve `/health` over HTTP until interrupted.
    RunHealthcheckServer {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}
