//! # Signal Bus Daemon
//!
//! Demonstration daemon for the `sbus` signal bus. Worker threads negotiate
//! simulated IKE security associations and report through the bus, a
//! [`TracingSink`] logs what the configured levels permit, and a controller
//! thread listens actively for the outcome of every negotiation.
//!
//! ## Example
//! ```rust
//! use sbus_daemon::Daemon;
//!
//! let summary = Daemon::builder().sessions(6).workers(3).fail_every(3).build().run()?;
//! assert_eq!(summary.outcome.established, 4);
//! assert_eq!(summary.outcome.failed, 2);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod controller;
pub mod session;
mod worker;

pub use controller::Outcome;
pub use session::IkeSa;

use anyhow::{Context, Result, anyhow};
use sbus::config::DaemonConfig;
use sbus::{Bus, TracingSink};
use std::fmt;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_SESSIONS: u32 = 4;
const DEFAULT_WORKERS: u32 = 2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fluent builder for configuring the [`Daemon`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug)]
pub struct DaemonBuilder {
    cfg: DaemonConfig,
    sessions: u32,
    workers: u32,
    fail_every: u32,
    timeout: Duration,
}

impl Default for DaemonBuilder {
    fn default() -> Self {
        Self {
            cfg: DaemonConfig::default(),
            sessions: DEFAULT_SESSIONS,
            workers: DEFAULT_WORKERS,
            fail_every: 0,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DaemonBuilder {
    pub fn config(mut self, cfg: DaemonConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Number of IKE_SAs to negotiate.
    pub const fn sessions(mut self, sessions: u32) -> Self {
        self.sessions = sessions;
        self
    }

    /// Number of worker threads; at least one is used.
    pub const fn workers(mut self, workers: u32) -> Self {
        self.workers = workers;
        self
    }

    /// Make every `n`-th session fail; zero disables failures.
    pub const fn fail_every(mut self, n: u32) -> Self {
        self.fail_every = n;
        self
    }

    /// How long the controller waits for all sessions to settle.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Daemon {
        let bus = Bus::new();
        let sink = Arc::new(TracingSink::new(self.cfg.levels.family_levels()));
        bus.add_listener(&sink);

        Daemon {
            bus,
            sink,
            sessions: self.sessions,
            workers: self.workers.max(1),
            fail_every: self.fail_every,
            timeout: self.timeout,
        }
    }
}

/// Result of a daemon run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub outcome: Outcome,
    pub listeners: usize,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} established, {} failed, {} signals seen by the controller in {:?}",
            self.outcome.established, self.outcome.failed, self.outcome.received, self.elapsed
        )
    }
}

/// The signal bus daemon.
#[derive(Debug)]
pub struct Daemon {
    bus: Bus,
    sink: Arc<TracingSink>,
    sessions: u32,
    workers: u32,
    fail_every: u32,
    timeout: Duration,
}

impl Daemon {
    pub fn builder() -> DaemonBuilder {
        DaemonBuilder::default()
    }

    #[must_use]
    pub const fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs every negotiation to completion and shuts the bus down.
    ///
    /// # Errors
    /// Returns an error if a thread cannot be spawned or panics.
    pub fn run(self) -> Result<Summary> {
        let started = Instant::now();
        info!(
            sessions = self.sessions,
            workers = self.workers,
            levels = ?self.sink.levels(),
            "Starting signal bus daemon"
        );

        let expected = usize::try_from(self.sessions).context("Too many sessions")?;
        let ready = Arc::new(Barrier::new(2));
        let controller = {
            let bus = self.bus.clone();
            let ready = Arc::clone(&ready);
            let timeout = self.timeout;
            thread::Builder::new()
                .name("controller".into())
                .spawn(move || controller::await_sessions(&bus, expected, timeout, &ready))
                .context("Failed to spawn controller thread")?
        };
        ready.wait();

        let workers = (0..self.workers)
            .map(|worker| {
                let bus = self.bus.clone();
                let stride = self.workers;
                let fail_every = self.fail_every;
                let ids = (1..=self.sessions).filter(move |id| id % stride == worker);
                thread::Builder::new()
                    .name(format!("worker-{worker}"))
                    .spawn(move || worker::negotiate(&bus, ids, fail_every))
                    .with_context(|| format!("Failed to spawn worker {worker}"))
            })
            .collect::<Result<Vec<_>>>()?;

        for handle in workers {
            handle.join().map_err(|_| anyhow!("Worker thread panicked"))?;
        }
        let outcome = controller.join().map_err(|_| anyhow!("Controller thread panicked"))?;

        let listeners = self.bus.shutdown();
        let summary = Summary { outcome, listeners, elapsed: started.elapsed() };
        info!(%summary, "Signal bus daemon finished");
        Ok(summary)
    }
}
