use crate::context::{self, BusId};
use crate::listener::Listener;
use crate::message::{Arg, Message};
use crate::record::Record;
use crate::registry::Registry;
use crate::rendezvous::Rendezvous;
use crate::session::SessionRef;
use crate::signal::{Level, Signal};
use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

#[derive(Debug)]
struct Inner {
    id: BusId,
    registry: Registry,
    core: Arc<Rendezvous>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let active = self.core.active();
        if active > 0 {
            warn!(active, "Signal bus dropped while threads are still listening");
        }
    }
}

/// In-process signal bus.
///
/// Passive [`Listener`]s are called inline on the emitting thread. Threads
/// that opt in with [`Bus::set_listen_state`] become active listeners and pull
/// records with [`Bus::listen`]; an emitter then blocks until every such
/// thread has taken its record.
///
/// `Bus` is a cheap handle; clones share the same registry and rendezvous.
#[derive(Debug, Clone)]
pub struct Bus {
    inner: Arc<Inner>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: BusId::next(),
                registry: Registry::default(),
                core: Arc::new(Rendezvous::new()),
            }),
        }
    }

    /// Registers a passive listener.
    ///
    /// The bus holds the listener weakly: dropping the last `Arc` unregisters
    /// it. Adding the same listener twice delivers every record to it twice.
    ///
    /// # Examples
    /// ```rust
    /// use sbus::{Bus, Level, Message, Record, Signal};
    /// use std::sync::{Arc, Mutex};
    ///
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = {
    ///     let seen = Arc::clone(&seen);
    ///     Arc::new(move |r: &Record| seen.lock().unwrap().push(r.signal()))
    /// };
    ///
    /// let bus = Bus::new();
    /// bus.add_listener(&sink);
    /// bus.signal(Signal::Cfg, Level::CTRL, Message::text("loaded"));
    /// assert_eq!(*seen.lock().unwrap(), [Signal::Cfg]);
    /// ```
    pub fn add_listener<L: Listener + 'static>(&self, listener: &Arc<L>) {
        self.inner.registry.add(listener);
        debug!(listeners = self.inner.registry.len(), "Listener added");
    }

    /// Unregisters every registration of `listener`.
    ///
    /// An emit that already took its snapshot may still call it once.
    pub fn remove_listener<L: Listener + 'static>(&self, listener: &Arc<L>) -> bool {
        let removed = self.inner.registry.remove(listener);
        if removed {
            debug!(listeners = self.inner.registry.len(), "Listener removed");
        }
        removed
    }

    /// Number of live passive listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of threads currently registered as active listeners.
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.inner.core.active()
    }

    /// Emits `message` under `signal` at `level`.
    ///
    /// Returns once every passive listener has run and every thread that was
    /// an active listener when the record was published has received it.
    /// [`Level::Silent`] returns immediately without delivering anything.
    ///
    /// If the calling thread is itself an active listener on this bus it is
    /// not waited on for its own record, and records it receives meanwhile are
    /// kept for its next [`Bus::listen`].
    pub fn signal(&self, signal: Signal, level: Level, message: Message) {
        self.emit(signal, level, message);
    }

    /// Emits a pre-built argument list; otherwise identical to [`Bus::signal`].
    ///
    /// # Panics
    /// Panics if the `{}` placeholders in `template` do not match `args`.
    #[track_caller]
    pub fn vsignal(
        &self,
        signal: Signal,
        level: Level,
        template: impl Into<Cow<'static, str>>,
        args: Vec<Arg>,
    ) {
        if level.is_silent() {
            return;
        }
        self.emit(signal, level, Message::new(template, args));
    }

    fn emit(&self, signal: Signal, level: Level, message: Message) {
        if level.is_silent() {
            return;
        }

        let inner = &*self.inner;
        let record = Record {
            signal,
            level,
            thread: context::current_thread_id(),
            session: context::session(inner.id),
            message: Arc::new(message),
        };
        trace!(signal = %signal, verbosity = level.as_i8(), thread = %record.thread, "Dispatching signal");

        for listener in inner.registry.snapshot() {
            listener.signal(&record);
        }

        if inner.core.active() == 0 {
            return;
        }
        context::with_cursor(inner.id, |own| inner.core.publish(record, own));
    }

    /// Blocks until the next record published to active listeners.
    ///
    /// Each record is returned at most once per thread. Records published
    /// while this thread was not listening are never returned.
    ///
    /// # Panics
    /// Panics if the calling thread is not an active listener on this bus.
    #[must_use]
    #[track_caller]
    pub fn listen(&self) -> Record {
        let core = &self.inner.core;
        context::with_cursor(self.inner.id, |cursor| match cursor {
            Some(cursor) => core.receive(cursor),
            None => panic!(
                "Bus::listen called on a thread that is not listening; call set_listen_state(true) first"
            ),
        })
    }

    /// Like [`Bus::listen`], returning `None` if nothing arrives within `timeout`.
    ///
    /// Producers are unaffected: a record published while this thread is
    /// listening still waits for it until taken or until the thread withdraws.
    /// A `timeout` too large to express as a deadline waits without limit.
    ///
    /// # Panics
    /// Panics if the calling thread is not an active listener on this bus.
    #[must_use]
    #[track_caller]
    pub fn listen_timeout(&self, timeout: Duration) -> Option<Record> {
        let deadline = Instant::now().checked_add(timeout);
        let core = &self.inner.core;
        context::with_cursor(self.inner.id, |cursor| match (cursor, deadline) {
            (Some(cursor), Some(deadline)) => core.receive_until(cursor, deadline),
            (Some(cursor), None) => Some(core.receive(cursor)),
            (None, _) => panic!(
                "Bus::listen_timeout called on a thread that is not listening; call set_listen_state(true) first"
            ),
        })
    }

    /// Declares whether the calling thread is an active listener.
    ///
    /// While listening, the thread must call [`Bus::listen`] promptly: every
    /// emitter on this bus blocks until it has taken each record. Withdrawing
    /// releases any record it still owed. A thread that exits while listening
    /// is withdrawn automatically.
    pub fn set_listen_state(&self, listening: bool) {
        let changed = if listening {
            context::begin_listening(self.inner.id, &self.inner.core)
        } else {
            context::end_listening(self.inner.id)
        };
        if changed {
            debug!(
                thread = %context::current_thread_id(),
                listening,
                active = self.inner.core.active(),
                "Listen state changed"
            );
        }
    }

    /// Whether the calling thread is an active listener on this bus.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        context::is_listening(self.inner.id)
    }

    /// Makes the calling thread an active listener until the guard drops.
    ///
    /// # Examples
    /// ```rust
    /// use sbus::Bus;
    /// use std::time::Duration;
    ///
    /// let bus = Bus::new();
    /// {
    ///     let guard = bus.listening();
    ///     assert_eq!(bus.active_listeners(), 1);
    ///     assert!(guard.recv_timeout(Duration::from_millis(1)).is_none());
    /// }
    /// assert_eq!(bus.active_listeners(), 0);
    /// ```
    pub fn listening(&self) -> ListenGuard<'_> {
        let began = !self.is_listening();
        self.set_listen_state(true);
        ListenGuard { bus: self, began, _not_send: PhantomData }
    }

    /// Sets the session attached to signals emitted by the calling thread.
    ///
    /// Pass `None` when the session is checked back in.
    #[doc(alias = "set_sa")]
    pub fn set_session(&self, session: Option<SessionRef>) {
        context::set_session(self.inner.id, session);
    }

    /// Session currently checked out by the calling thread.
    #[must_use]
    pub fn session(&self) -> Option<SessionRef> {
        context::session(self.inner.id)
    }

    /// Drops every passive listener registration and returns how many were live.
    ///
    /// Active listeners are the caller's to stop; the bus only reports them.
    pub fn shutdown(&self) -> usize {
        let released = self.inner.registry.clear();
        let active = self.inner.core.active();
        if active > 0 {
            warn!(active, "Shutting down signal bus while threads are still listening");
        }
        debug!(released, "Signal bus shut down");
        released
    }
}

/// Active-listener registration of the current thread, from [`Bus::listening`].
///
/// Dropping the guard withdraws the thread, unless it was already listening
/// before the guard was taken.
#[must_use = "the thread stops listening when the guard is dropped"]
#[derive(Debug)]
pub struct ListenGuard<'a> {
    bus: &'a Bus,
    began: bool,
    _not_send: PhantomData<*const ()>,
}

impl ListenGuard<'_> {
    /// See [`Bus::listen`].
    #[must_use]
    pub fn recv(&self) -> Record {
        self.bus.listen()
    }

    /// See [`Bus::listen_timeout`].
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Record> {
        self.bus.listen_timeout(timeout)
    }
}

impl Drop for ListenGuard<'_> {
    fn drop(&mut self) {
        if self.began {
            self.bus.set_listen_state(false);
        }
    }
}
