//! Single-slot rendezvous between emitting threads and active listeners.
//!
//! All shared state lives under one mutex:
//!
//! ```text
//!   producer                    State                       active listeners
//!   --------             +-----------------+               ----------------
//!   publish() ---------> | pending: Record | --published--> receive()
//!       ^                | remaining: K    |                  |
//!       +---drained----- | generation: G   | <----- ack ------+
//!                        | active: N       |
//!                        +-----------------+
//! ```
//!
//! Every published record carries a monotonically increasing generation. A
//! listener remembers the last generation it consumed (its cursor), which is
//! how a thread that calls `receive` twice never takes the same record twice
//! and a thread that joined after a publish is never counted for it.

use crate::record::Record;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub(crate) struct Rendezvous {
    state: Mutex<State>,
    published: Condvar,
    drained: Condvar,
}

#[derive(Debug, Default)]
struct State {
    active: usize,
    generation: u64,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    remaining: usize,
    record: Record,
}

/// Per-thread view of the rendezvous, owned by the listening thread.
#[derive(Debug)]
pub(crate) struct Cursor {
    last_seen: u64,
    backlog: VecDeque<Record>,
}

impl Cursor {
    const fn new(last_seen: u64) -> Self {
        Self { last_seen, backlog: VecDeque::new() }
    }

    pub(crate) const fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

impl State {
    /// Acknowledges the pending record for a listener positioned at `cursor`.
    ///
    /// Returns the record if it was still owed to that listener, and whether
    /// this acknowledgement drained the slot.
    fn consume(&mut self, cursor: &mut Cursor) -> Option<(Record, bool)> {
        let pending = self.pending.as_mut().filter(|p| p.generation > cursor.last_seen)?;
        cursor.last_seen = pending.generation;
        pending.remaining -= 1;
        let record = pending.record.clone();
        let drained = pending.remaining == 0;
        if drained {
            self.pending = None;
        }
        Some((record, drained))
    }

    /// Drops the ack a withdrawing listener still owed. Returns `true` when
    /// that drained the slot.
    fn release(&mut self, cursor: &Cursor) -> bool {
        let Some(pending) = self.pending.as_mut().filter(|p| p.generation > cursor.last_seen)
        else {
            return false;
        };
        pending.remaining -= 1;
        let drained = pending.remaining == 0;
        if drained {
            self.pending = None;
        }
        drained
    }
}

impl Rendezvous {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(State::default()), published: Condvar::new(), drained: Condvar::new() }
    }

    pub(crate) fn active(&self) -> usize {
        self.state.lock().active
    }

    /// Registers the calling thread as an active listener.
    ///
    /// The returned cursor starts at the latest generation, so a record that
    /// is already in flight is neither owed to nor delivered to this thread.
    pub(crate) fn join(&self) -> Cursor {
        let mut state = self.state.lock();
        state.active += 1;
        Cursor::new(state.generation)
    }

    /// Deregisters a listener, releasing any record it still owed an ack for.
    pub(crate) fn withdraw(&self, cursor: &Cursor) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
        if state.release(cursor) {
            self.drained.notify_all();
        }
    }

    /// Hands `record` to every active listener and blocks until all of them
    /// have taken it.
    ///
    /// `own` is the emitter's cursor when the emitter is itself an active
    /// listener on this bus. The emitter is then left out of its own record,
    /// and records of other producers that it owes an ack for while waiting
    /// for the slot are parked in its backlog instead of deadlocking.
    ///
    /// Returns the generation of the published record, or `None` when no
    /// other listener was active.
    pub(crate) fn publish(&self, record: Record, mut own: Option<&mut Cursor>) -> Option<u64> {
        let mut state = self.state.lock();

        while state.pending.is_some() {
            if let Some(cursor) = own.as_deref_mut()
                && let Some((owed, drained)) = state.consume(cursor)
            {
                cursor.backlog.push_back(owed);
                if drained {
                    self.drained.notify_all();
                }
                continue;
            }
            self.drained.wait(&mut state);
        }

        let waiting = state.active.saturating_sub(usize::from(own.is_some()));
        if waiting == 0 {
            return None;
        }

        state.generation += 1;
        let generation = state.generation;
        trace!(generation, waiting, signal = %record.signal, "Publishing record to active listeners");
        state.pending = Some(Pending { generation, remaining: waiting, record });
        self.published.notify_all();

        while state.pending.as_ref().is_some_and(|p| p.generation == generation) {
            self.drained.wait(&mut state);
        }
        drop(state);

        if let Some(cursor) = own {
            cursor.last_seen = generation;
        }
        Some(generation)
    }

    /// Blocks until a record owed to `cursor` is available.
    pub(crate) fn receive(&self, cursor: &mut Cursor) -> Record {
        if let Some(record) = cursor.backlog.pop_front() {
            return record;
        }
        let mut state = self.state.lock();
        loop {
            if let Some(record) = self.take(&mut state, cursor) {
                return record;
            }
            self.published.wait(&mut state);
        }
    }

    /// Like [`Rendezvous::receive`], giving up at `deadline`.
    pub(crate) fn receive_until(&self, cursor: &mut Cursor, deadline: Instant) -> Option<Record> {
        if let Some(record) = cursor.backlog.pop_front() {
            return Some(record);
        }
        let mut state = self.state.lock();
        loop {
            if let Some(record) = self.take(&mut state, cursor) {
                return Some(record);
            }
            if self.published.wait_until(&mut state, deadline).timed_out() {
                return self.take(&mut state, cursor);
            }
        }
    }

    fn take(&self, state: &mut MutexGuard<'_, State>, cursor: &mut Cursor) -> Option<Record> {
        let (record, drained) = state.consume(cursor)?;
        if drained {
            self.drained.notify_all();
        }
        Some(record)
    }
}
