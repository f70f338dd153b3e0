use crate::message::Message;
use crate::session::SessionRef;
use crate::signal::{Level, Signal};
use std::fmt;
use std::sync::Arc;

/// Small numeric identifier of an emitting thread.
///
/// Assigned on first use of the bus by a thread and stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub(crate) u32);

impl ThreadId {
    /// Reported by a thread whose bus context has already been torn down.
    pub const ANONYMOUS: Self = Self(0);

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// One emitted signal as seen by listeners.
///
/// Cloning is cheap; the message body is shared.
#[derive(Debug, Clone)]
pub struct Record {
    pub(crate) signal: Signal,
    pub(crate) level: Level,
    pub(crate) thread: ThreadId,
    pub(crate) session: Option<SessionRef>,
    pub(crate) message: Arc<Message>,
}

impl Record {
    #[must_use]
    pub const fn signal(&self) -> Signal {
        self.signal
    }

    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Thread that emitted the signal.
    #[must_use]
    pub const fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Session the emitting thread had checked out, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&SessionRef> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }
}
