use sbus::{Audit, Bus, Operation, Phase, Record, SessionKind};
use std::sync::Barrier;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What the controller observed while waiting for sessions to settle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub established: usize,
    pub failed: usize,
    pub received: usize,
}

impl Outcome {
    /// Sessions that either came up or failed.
    #[must_use]
    pub const fn settled(&self) -> usize {
        self.established + self.failed
    }

    fn observe(&mut self, record: &Record) {
        self.received += 1;
        let Some(Audit { session: SessionKind::Ike, operation: Operation::Up, phase }) =
            record.signal().audit()
        else {
            return;
        };
        match phase {
            Phase::Start => {},
            Phase::Success => self.established += 1,
            Phase::Failed => self.failed += 1,
        }
    }
}

/// Listens actively until `expected` IKE_SAs have come up or failed, or `timeout` passes.
///
/// `ready` is released once this thread is registered, so producers started
/// afterwards never slip past it.
pub(crate) fn await_sessions(
    bus: &Bus,
    expected: usize,
    timeout: Duration,
    ready: &Barrier,
) -> Outcome {
    let guard = bus.listening();
    ready.wait();

    let deadline = Instant::now().checked_add(timeout);
    let mut outcome = Outcome::default();
    while outcome.settled() < expected {
        let remaining =
            deadline.map_or(Duration::MAX, |d| d.saturating_duration_since(Instant::now()));
        if remaining.is_zero() {
            warn!(expected, settled = outcome.settled(), "Timed out waiting for IKE_SAs");
            break;
        }
        if let Some(record) = guard.recv_timeout(remaining) {
            outcome.observe(&record);
        }
    }
    debug!(?outcome, "Controller done");
    outcome
}
