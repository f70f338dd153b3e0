use crate::listener::Listener;
use crate::record::Record;
use crate::signal::{DEBUG_MAX, Level, Signal};
use std::fmt;
use tracing::{debug, info, trace};

/// Verbosity threshold per debug family.
///
/// Audit signals are looked up under [`Signal::Any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyLevels {
    levels: [Level; DEBUG_MAX as usize],
}

impl FamilyLevels {
    /// Every family at `level`.
    #[must_use]
    pub const fn uniform(level: Level) -> Self {
        Self { levels: [level; DEBUG_MAX as usize] }
    }

    /// Overrides the threshold of `signal`'s family.
    #[must_use]
    pub const fn with(mut self, signal: Signal, level: Level) -> Self {
        self.levels[signal.family().tag() as usize] = level;
        self
    }

    #[must_use]
    pub const fn get(&self, signal: Signal) -> Level {
        self.levels[signal.family().tag() as usize]
    }

    #[must_use]
    pub const fn permits(&self, signal: Signal, level: Level) -> bool {
        self.get(signal).permits(level)
    }
}

impl Default for FamilyLevels {
    fn default() -> Self {
        Self::uniform(Level::CTRL)
    }
}

/// Passive listener forwarding records to `tracing`.
///
/// Levels 0 and 1 are logged at `INFO`, level 2 at `DEBUG`, levels 3 and 4 at
/// `TRACE`, all under the `sbus` target.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    levels: FamilyLevels,
}

impl TracingSink {
    #[must_use]
    pub const fn new(levels: FamilyLevels) -> Self {
        Self { levels }
    }

    #[must_use]
    pub const fn levels(&self) -> &FamilyLevels {
        &self.levels
    }
}

struct Label<'a>(&'a Record);

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.session().and_then(crate::SessionRef::label) {
            Some(session) => write!(f, "{} {} {}", self.0.thread(), self.0.signal(), session),
            None => write!(f, "{} {}", self.0.thread(), self.0.signal()),
        }
    }
}

impl Listener for TracingSink {
    fn signal(&self, record: &Record) {
        if !self.levels.permits(record.signal(), record.level()) {
            return;
        }
        let label = Label(record);
        let verbosity = record.level().as_i8();
        let message = record.message();
        match record.level() {
            Level::L0 | Level::L1 => info!(target: "sbus", verbosity, "{label} {message}"),
            Level::L2 => debug!(target: "sbus", verbosity, "{label} {message}"),
            _ => trace!(target: "sbus", verbosity, "{label} {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_control_level() {
        let levels = FamilyLevels::default();
        assert!(levels.permits(Signal::Ike, Level::CTRL));
        assert!(!levels.permits(Signal::Ike, Level::CTRLMORE));
        assert!(levels.permits(Signal::IkeUpStart, Level::AUDIT));
    }

    #[test]
    fn test_overrides_apply_per_family() {
        let levels = FamilyLevels::uniform(Level::AUDIT)
            .with(Signal::Knl, Level::PRIVATE)
            .with(Signal::Net, Level::Silent)
            .with(Signal::ChildUpSuccess, Level::RAW);

        assert!(levels.permits(Signal::Knl, Level::PRIVATE));
        assert!(!levels.permits(Signal::Net, Level::AUDIT));
        assert!(!levels.permits(Signal::Cfg, Level::CTRL));
        // Audit signals share the wildcard threshold.
        assert_eq!(levels.get(Signal::Any), Level::RAW);
        assert!(levels.permits(Signal::IkeDownFailed, Level::RAW));
    }
}
