#![allow(dead_code, unreachable_pub)]

use parking_lot::Mutex;
use sbus::{Bus, Level, Listener, Record, Session, Signal, ThreadId};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Owned copy of what a listener saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub signal: Signal,
    pub level: Level,
    pub thread: ThreadId,
    pub session: Option<String>,
    pub template: String,
    pub text: String,
}

impl From<&Record> for Seen {
    fn from(record: &Record) -> Self {
        Self {
            signal: record.signal(),
            level: record.level(),
            thread: record.thread(),
            session: record.session().and_then(sbus::SessionRef::label),
            template: record.message().template().to_owned(),
            text: record.message().render(),
        }
    }
}

/// Passive listener recording every call.
#[derive(Debug, Default)]
pub struct Capture {
    seen: Mutex<Vec<Seen>>,
}

impl Capture {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Listener for Capture {
    fn signal(&self, record: &Record) {
        self.seen.lock().push(Seen::from(record));
    }
}

#[derive(Debug)]
pub struct TestSession {
    pub name: String,
    pub id: u32,
}

impl TestSession {
    #[must_use]
    pub fn new(name: &str, id: u32) -> Arc<Self> {
        Arc::new(Self { name: name.to_owned(), id })
    }
}

impl Session for TestSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> u32 {
        self.id
    }
}

/// Spins until `bus` has `count` active listeners.
///
/// # Panics
/// If that does not happen within five seconds.
pub fn wait_for_active(bus: &Bus, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while bus.active_listeners() != count {
        assert!(Instant::now() < deadline, "expected {count} active listeners");
        thread::sleep(Duration::from_millis(1));
    }
}
