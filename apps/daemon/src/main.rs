use anyhow::Context;
use clap::Parser;
use sbus::config::{DaemonConfig, LogConfig, load_config};
use sbus_daemon::Daemon;
use sbus_logger::{LevelFilter, Logger};
use std::path::PathBuf;
use std::time::Duration;

/// Signal bus demonstration daemon.
#[derive(Debug, Parser)]
#[command(name = "sbusd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Runs simulated IKE negotiations over the signal bus")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); `SBUS__*` variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of IKE_SAs to negotiate
    #[arg(short, long, default_value_t = 4)]
    sessions: u32,
    /// Number of worker threads
    #[arg(short, long, default_value_t = 2)]
    workers: u32,
    /// Make every n-th session fail (0 = never)
    #[arg(long, default_value_t = 0)]
    fail_every: u32,
    /// Seconds the controller waits for all sessions
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

fn init_logger(log: &LogConfig) -> anyhow::Result<Logger> {
    let builder = Logger::builder()
        .name(env!("CARGO_BIN_NAME"))
        .console(log.console)
        .level(LevelFilter::INFO)
        .signals(LevelFilter::TRACE);
    let builder = match &log.filter {
        Some(filter) => builder.env_filter(filter),
        None => builder,
    };
    let logger = match &log.path {
        Some(path) => builder.path(path).max_files(log.max_files).json(log.json).init()?,
        None => builder.init()?,
    };
    Ok(logger)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: DaemonConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;
    let _log = init_logger(&cfg.log)?;

    let expected = usize::try_from(cli.sessions)?;
    let summary = Daemon::builder()
        .config(cfg)
        .sessions(cli.sessions)
        .workers(cli.workers)
        .fail_every(cli.fail_every)
        .timeout(Duration::from_secs(cli.timeout))
        .build()
        .run()?;

    let settled = summary.outcome.settled();
    anyhow::ensure!(
        settled == expected,
        "{} of {expected} sessions never settled",
        expected.saturating_sub(settled)
    );
    Ok(())
}
