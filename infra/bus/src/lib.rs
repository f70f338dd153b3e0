//! # Signal Bus
//!
//! In-process, multi-threaded signal bus for daemon diagnostics and session
//! lifecycle auditing.
//!
//! ## Overview
//!
//! Worker threads emit [`Signal`]s at a verbosity [`Level`] with a structured
//! [`Message`]. Every emit is delivered in two phases:
//!
//! 1. **Passive**: each registered [`Listener`] is called inline on the
//!    emitting thread, in registration order.
//! 2. **Active**: threads that declared themselves listening receive the
//!    record through [`Bus::listen`]. The emitter blocks until every thread
//!    that was listening at publish time has taken it, and only one record is
//!    in flight at a time.
//!
//! Each thread carries its own context: a small [`ThreadId`], the session it
//! has checked out (attached to every record it emits) and whether it is an
//! active listener.
//!
//! ## Features
//!
//! * **Weak registrations**: listeners and sessions are never kept alive by the bus.
//! * **Checked messages**: placeholder and argument counts are validated up front.
//! * **Self-cleaning**: a listening thread that exits is withdrawn automatically.
//! * **`tracing` sink**: [`TracingSink`] filters per signal family and forwards to `tracing`.
//!
//! # Example
//!
//! ```rust
//! use sbus::{Bus, Signal, dbg2, sig};
//! use std::thread;
//!
//! let bus = Bus::new();
//!
//! let listener = {
//!     let bus = bus.clone();
//!     thread::spawn(move || {
//!         let guard = bus.listening();
//!         guard.recv()
//!     })
//! };
//!
//! while bus.active_listeners() == 0 {
//!     thread::yield_now();
//! }
//! dbg2!(bus, Signal::Ike, "sending {} bytes", 312_u32);
//! sig!(bus, Signal::IkeUpSuccess, "established");
//!
//! let record = listener.join().unwrap();
//! assert_eq!(record.signal(), Signal::Ike);
//! assert_eq!(record.message().render(), "sending 312 bytes");
//! ```

mod bus;
pub mod config;
mod context;
mod error;
mod listener;
mod message;
mod record;
mod registry;
mod rendezvous;
mod session;
mod signal;
mod sink;

pub use bus::{Bus, ListenGuard};
pub use context::current_thread_id;
pub use error::{ConfigError, ConfigErrorExt, MessageError, MessageErrorExt, ModelError};
pub use listener::Listener;
pub use message::{Arg, Message};
pub use record::{Record, ThreadId};
pub use session::{Session, SessionRef};
pub use signal::{
    Audit, DEBUG_FAMILIES, DEBUG_MAX, Level, Operation, Phase, SIGNAL_MAX, SessionKind, Signal,
    signal_family,
};
pub use sink::{FamilyLevels, TracingSink};

/// Emits an audit signal at level 0.
///
/// ```rust
/// # let bus = sbus::Bus::new();
/// sbus::sig!(bus, sbus::Signal::ChildUpStart, "installing {} policies", 2_u8);
/// ```
#[macro_export]
macro_rules! sig {
    ($bus:expr, $signal:expr, $($msg:tt)+) => {
        $bus.signal($signal, $crate::Level::L0, $crate::message!($($msg)+))
    };
}

/// Emits a debug signal at level 1 (control flow).
#[macro_export]
macro_rules! dbg1 {
    ($bus:expr, $signal:expr, $($msg:tt)+) => {
        $bus.signal($signal, $crate::Level::L1, $crate::message!($($msg)+))
    };
}

/// Emits a debug signal at level 2 (detailed control flow).
#[macro_export]
macro_rules! dbg2 {
    ($bus:expr, $signal:expr, $($msg:tt)+) => {
        $bus.signal($signal, $crate::Level::L2, $crate::message!($($msg)+))
    };
}

/// Emits a debug signal at level 3 (raw data).
#[macro_export]
macro_rules! dbg3 {
    ($bus:expr, $signal:expr, $($msg:tt)+) => {
        $bus.signal($signal, $crate::Level::L3, $crate::message!($($msg)+))
    };
}

/// Emits a debug signal at level 4 (private material such as keys).
#[macro_export]
macro_rules! dbg4 {
    ($bus:expr, $signal:expr, $($msg:tt)+) => {
        $bus.signal($signal, $crate::Level::L4, $crate::message!($($msg)+))
    };
}
