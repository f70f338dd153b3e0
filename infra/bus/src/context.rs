//! Per-thread bus state.
//!
//! Each thread owns one [`ThreadContext`], created lazily on first use. It
//! holds, per bus, the session the thread has checked out and, while the
//! thread is an active listener, its rendezvous cursor. No other thread ever
//! touches it; the rendezvous core only sees the aggregate active count.

use crate::record::ThreadId;
use crate::rendezvous::{Cursor, Rendezvous};
use crate::session::SessionRef;
use fxhash::FxHashMap;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_THREAD: AtomicU32 = AtomicU32::new(1);
static NEXT_BUS: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONTEXT: RefCell<ThreadContext> = RefCell::new(ThreadContext::new());
}

/// Identity of a bus instance inside thread-local maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BusId(u64);

impl BusId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BUS.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
struct ThreadContext {
    id: ThreadId,
    slots: FxHashMap<BusId, Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    session: Option<SessionRef>,
    listening: Option<Listening>,
}

impl Slot {
    const fn is_empty(&self) -> bool {
        self.session.is_none() && self.listening.is_none()
    }
}

/// Active-listener registration of one thread on one bus.
///
/// Dropping it withdraws the thread from the rendezvous. This also happens
/// when the thread exits, so producers never wait on a thread that is gone.
#[derive(Debug)]
struct Listening {
    core: Weak<Rendezvous>,
    cursor: Cursor,
}

impl Drop for Listening {
    fn drop(&mut self) {
        if let Some(core) = self.core.upgrade() {
            core.withdraw(&self.cursor);
        }
    }
}

impl ThreadContext {
    fn new() -> Self {
        Self {
            id: ThreadId(NEXT_THREAD.fetch_add(1, Ordering::Relaxed)),
            slots: FxHashMap::default(),
        }
    }

    fn prune(&mut self, bus: BusId) {
        if self.slots.get(&bus).is_some_and(Slot::is_empty) {
            self.slots.remove(&bus);
        }
    }
}

/// Identifier of the calling thread.
///
/// [`ThreadId::ANONYMOUS`] once the thread's bus context has been destroyed,
/// e.g. when called from another thread-local's destructor.
pub fn current_thread_id() -> ThreadId {
    CONTEXT.try_with(|ctx| ctx.borrow().id).unwrap_or(ThreadId::ANONYMOUS)
}

pub(crate) fn session(bus: BusId) -> Option<SessionRef> {
    CONTEXT
        .try_with(|ctx| ctx.borrow().slots.get(&bus).and_then(|slot| slot.session.clone()))
        .ok()
        .flatten()
}

pub(crate) fn set_session(bus: BusId, session: Option<SessionRef>) {
    CONTEXT.with_borrow_mut(|ctx| {
        ctx.slots.entry(bus).or_default().session = session;
        ctx.prune(bus);
    });
}

pub(crate) fn is_listening(bus: BusId) -> bool {
    CONTEXT.with_borrow(|ctx| ctx.slots.get(&bus).is_some_and(|slot| slot.listening.is_some()))
}

/// Makes the calling thread an active listener. Returns `false` if it already was.
pub(crate) fn begin_listening(bus: BusId, core: &Arc<Rendezvous>) -> bool {
    CONTEXT.with_borrow_mut(|ctx| {
        let slot = ctx.slots.entry(bus).or_default();
        if slot.listening.is_some() {
            return false;
        }
        slot.listening = Some(Listening { core: Arc::downgrade(core), cursor: core.join() });
        true
    })
}

/// Withdraws the calling thread. Returns `false` if it was not listening.
pub(crate) fn end_listening(bus: BusId) -> bool {
    let listening = CONTEXT.with_borrow_mut(|ctx| {
        let listening = ctx.slots.get_mut(&bus).and_then(|slot| slot.listening.take());
        ctx.prune(bus);
        listening
    });
    listening.is_some()
}

/// Runs `f` with the calling thread's cursor on `bus`, if it is listening.
///
/// The context stays borrowed while `f` runs, which may block; nothing else
/// on this thread can run in the meantime. A thread whose context is gone is
/// never listening.
pub(crate) fn with_cursor<R>(bus: BusId, f: impl FnOnce(Option<&mut Cursor>) -> R) -> R {
    if CONTEXT.try_with(|_| ()).is_err() {
        return f(None);
    }
    CONTEXT.with_borrow_mut(|ctx| {
        f(ctx.slots.get_mut(&bus).and_then(|slot| slot.listening.as_mut()).map(|l| &mut l.cursor))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_thread_ids_are_stable_and_distinct() {
        let here = current_thread_id();
        assert_eq!(here, current_thread_id());
        let there = thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_listening_toggles_and_counts() {
        let bus = BusId::next();
        let core = Arc::new(Rendezvous::new());

        assert!(!is_listening(bus));
        assert!(begin_listening(bus, &core));
        assert!(!begin_listening(bus, &core));
        assert_eq!(core.active(), 1);

        assert!(end_listening(bus));
        assert!(!end_listening(bus));
        assert_eq!(core.active(), 0);
        assert!(CONTEXT.with_borrow(|ctx| !ctx.slots.contains_key(&bus)));
    }

    #[test]
    fn test_context_survives_late_thread_local_destructors() {
        struct EmitOnExit(crate::Bus, std::sync::mpsc::Sender<ThreadId>);

        impl Drop for EmitOnExit {
            fn drop(&mut self) {
                self.0.signal(
                    crate::Signal::Dmn,
                    crate::Level::CTRL,
                    crate::Message::text("thread exiting"),
                );
                let _ = self.1.send(current_thread_id());
            }
        }

        thread_local! {
            static LATE: RefCell<Option<EmitOnExit>> = const { RefCell::new(None) };
        }

        let bus = crate::Bus::new();
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = {
            let seen = Arc::clone(&seen);
            Arc::new(move |_: &crate::Record| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
        };
        bus.add_listener(&counter);

        let (tx, rx) = std::sync::mpsc::channel();
        let remote = bus.clone();
        thread::spawn(move || {
            LATE.with_borrow_mut(|late| *late = Some(EmitOnExit(remote.clone(), tx)));
            remote.set_listen_state(true);
        })
        .join()
        .unwrap();

        rx.recv().expect("destructor ran to completion");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.active_listeners(), 0);
    }

    #[test]
    fn test_thread_exit_withdraws() {
        let bus = BusId::next();
        let core = Arc::new(Rendezvous::new());
        let remote = Arc::clone(&core);
        thread::spawn(move || assert!(begin_listening(bus, &remote))).join().unwrap();
        assert_eq!(core.active(), 0);
    }
}
