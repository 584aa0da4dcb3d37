//! Tracing subscriber setup for the `jst` binary
//!
//! `jst-core` only emits events; this is the one place a subscriber is installed.
//! Default level is `warn`; each `--verbose` raises it (`info`, `debug`, `trace`),
//! `--quiet` drops it to `error`, and `RUST_LOG` overrides both.

use std::io::IsTerminal as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let level = level(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jst={level},jst_core={level}")));

    // Log lines go to stderr, next to the cliclack output
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}

fn level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
