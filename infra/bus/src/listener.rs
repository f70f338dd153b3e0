use crate::record::Record;

/// A passive bus listener.
///
/// `signal` runs synchronously on the emitting thread, before active
/// listeners are served, so it delays the emitter and every listener queued
/// behind it. Keep it short and non-blocking; local formatting is fine,
/// further blocking I/O is not.
///
/// Any `Fn(&Record)` closure is a listener.
pub trait Listener: Send + Sync {
    fn signal(&self, record: &Record);
}

impl<F> Listener for F
where
    F: Fn(&Record) + Send + Sync,
{
    fn signal(&self, record: &Record) {
        self(record);
    }
}
