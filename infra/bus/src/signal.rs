use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Number of debug families (`DMN` through `LIB`).
pub const DEBUG_FAMILIES: u8 = 10;
/// First tag past the debug range. Tags at or above it are audit signals.
pub const DEBUG_MAX: u8 = DEBUG_FAMILIES + 1;
/// One past the last valid signal tag.
pub const SIGNAL_MAX: u8 = 36;

/// Signals emitted by the daemon.
///
/// Debug signals identify the subsystem a trace originates from. Audit signals
/// come in `(start, success, failed)` triples per lifecycle operation, so a
/// listener can follow one operation across threads: a `*_START` is always
/// terminated by exactly one of its `*_SUCCESS` or `*_FAILED` siblings.
///
/// Tags are stable small integers; tag `11` is reserved as the end of the
/// debug range and never names a signal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
    Deserialize,
)]
#[serde(try_from = "String")]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Signal {
    /// Pseudo signal, representing any other signal.
    #[strum(serialize = "ANY")]
    Any = 0,

    /// Daemon main loop.
    #[strum(serialize = "DMN")]
    Dmn = 1,
    /// Session manager.
    #[strum(serialize = "MGR")]
    Mgr = 2,
    /// Outer (IKE) session.
    #[strum(serialize = "IKE")]
    Ike = 3,
    /// Inner (CHILD) session.
    #[strum(serialize = "CHD")]
    Chd = 4,
    /// Job processing.
    #[strum(serialize = "JOB")]
    Job = 5,
    /// Configuration backends.
    #[strum(serialize = "CFG")]
    Cfg = 6,
    /// Kernel interface.
    #[strum(serialize = "KNL")]
    Knl = 7,
    /// Networking.
    #[strum(serialize = "NET")]
    Net = 8,
    /// Message encoding/decoding.
    #[strum(serialize = "ENC")]
    Enc = 9,
    /// External library logging hook.
    #[strum(serialize = "LIB")]
    Lib = 10,

    #[strum(serialize = "IKE_UP_START")]
    IkeUpStart = 12,
    #[strum(serialize = "IKE_UP_SUCCESS")]
    IkeUpSuccess = 13,
    #[strum(serialize = "IKE_UP_FAILED")]
    IkeUpFailed = 14,

    #[strum(serialize = "IKE_DOWN_START")]
    IkeDownStart = 15,
    #[strum(serialize = "IKE_DOWN_SUCCESS")]
    IkeDownSuccess = 16,
    #[strum(serialize = "IKE_DOWN_FAILED")]
    IkeDownFailed = 17,

    #[strum(serialize = "IKE_REKEY_START")]
    IkeRekeyStart = 18,
    #[strum(serialize = "IKE_REKEY_SUCCESS")]
    IkeRekeySuccess = 19,
    #[strum(serialize = "IKE_REKEY_FAILED")]
    IkeRekeyFailed = 20,

    #[strum(serialize = "CHILD_UP_START")]
    ChildUpStart = 21,
    #[strum(serialize = "CHILD_UP_SUCCESS")]
    ChildUpSuccess = 22,
    #[strum(serialize = "CHILD_UP_FAILED")]
    ChildUpFailed = 23,

    #[strum(serialize = "CHILD_DOWN_START")]
    ChildDownStart = 24,
    #[strum(serialize = "CHILD_DOWN_SUCCESS")]
    ChildDownSuccess = 25,
    #[strum(serialize = "CHILD_DOWN_FAILED")]
    ChildDownFailed = 26,

    #[strum(serialize = "CHILD_REKEY_START")]
    ChildRekeyStart = 27,
    #[strum(serialize = "CHILD_REKEY_SUCCESS")]
    ChildRekeySuccess = 28,
    #[strum(serialize = "CHILD_REKEY_FAILED")]
    ChildRekeyFailed = 29,

    #[strum(serialize = "CHILD_ROUTE_START")]
    ChildRouteStart = 30,
    #[strum(serialize = "CHILD_ROUTE_SUCCESS")]
    ChildRouteSuccess = 31,
    #[strum(serialize = "CHILD_ROUTE_FAILED")]
    ChildRouteFailed = 32,

    #[strum(serialize = "CHILD_UNROUTE_START")]
    ChildUnrouteStart = 33,
    #[strum(serialize = "CHILD_UNROUTE_SUCCESS")]
    ChildUnrouteSuccess = 34,
    #[strum(serialize = "CHILD_UNROUTE_FAILED")]
    ChildUnrouteFailed = 35,
}

/// The session kind an audit signal reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SessionKind {
    #[strum(serialize = "IKE")]
    Ike,
    #[strum(serialize = "CHILD")]
    Child,
}

/// Lifecycle operation of an audit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Operation {
    #[strum(serialize = "UP")]
    Up,
    #[strum(serialize = "DOWN")]
    Down,
    #[strum(serialize = "REKEY")]
    Rekey,
    #[strum(serialize = "ROUTE")]
    Route,
    #[strum(serialize = "UNROUTE")]
    Unroute,
}

/// Position of an audit signal inside its triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    #[strum(serialize = "START")]
    Start,
    #[strum(serialize = "SUCCESS")]
    Success,
    #[strum(serialize = "FAILED")]
    Failed,
}

impl Phase {
    /// `true` for `Success` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Start)
    }
}

/// Decomposed audit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Audit {
    pub session: SessionKind,
    pub operation: Operation,
    pub phase: Phase,
}

const AUDIT_TRIPLES: [(SessionKind, Operation); 8] = [
    (SessionKind::Ike, Operation::Up),
    (SessionKind::Ike, Operation::Down),
    (SessionKind::Ike, Operation::Rekey),
    (SessionKind::Child, Operation::Up),
    (SessionKind::Child, Operation::Down),
    (SessionKind::Child, Operation::Rekey),
    (SessionKind::Child, Operation::Route),
    (SessionKind::Child, Operation::Unroute),
];

impl Signal {
    /// Numeric tag of the signal.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Looks up a signal by its numeric tag.
    #[must_use]
    pub fn from_raw(tag: u8) -> Option<Self> {
        Self::from_repr(tag)
    }

    /// Short name used in log output (`IKE`, `CHILD_UP_START`, ...).
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// `true` for the debug families, excluding the [`Signal::Any`] wildcard.
    #[must_use]
    pub const fn is_debug(self) -> bool {
        let tag = self.tag();
        tag > 0 && tag < DEBUG_MAX
    }

    #[must_use]
    pub const fn is_audit(self) -> bool {
        self.tag() > DEBUG_MAX
    }

    /// Debug family of the signal; audit signals map to [`Signal::Any`].
    #[must_use]
    pub const fn family(self) -> Self {
        if self.tag() < DEBUG_MAX { self } else { Self::Any }
    }

    /// Splits an audit signal into session kind, operation and phase.
    #[must_use]
    pub const fn audit(self) -> Option<Audit> {
        if !self.is_audit() {
            return None;
        }
        let offset = (self.tag() - DEBUG_MAX - 1) as usize;
        let (session, operation) = AUDIT_TRIPLES[offset / 3];
        let phase = match offset % 3 {
            0 => Phase::Start,
            1 => Phase::Success,
            _ => Phase::Failed,
        };
        Some(Audit { session, operation, phase })
    }
}

/// Family of a raw tag; anything outside the debug range is the wildcard.
#[must_use]
pub fn signal_family(tag: u8) -> Signal {
    if tag < DEBUG_MAX { Signal::from_repr(tag).unwrap_or(Signal::Any) } else { Signal::Any }
}

impl TryFrom<String> for Signal {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map_err(|_| ModelError::UnknownSignal { message: value.into(), context: None })
    }
}

/// Verbosity level of a signal.
///
/// Levels are totally ordered, `Silent` sorting below everything. A sink
/// configured with threshold `t` delivers every signal with `level <= t`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(try_from = "i8", into = "i8")]
#[repr(i8)]
pub enum Level {
    /// Never emitted, never delivered.
    #[strum(serialize = "SILENT")]
    Silent = -1,
    #[default]
    #[strum(serialize = "AUDIT")]
    L0 = 0,
    #[strum(serialize = "CTRL")]
    L1 = 1,
    #[strum(serialize = "CTRLMORE")]
    L2 = 2,
    #[strum(serialize = "RAW")]
    L3 = 3,
    /// May include private material such as key dumps.
    #[strum(serialize = "PRIVATE")]
    L4 = 4,
}

impl Level {
    pub const AUDIT: Self = Self::L0;
    pub const CTRL: Self = Self::L1;
    pub const CTRLMORE: Self = Self::L2;
    pub const RAW: Self = Self::L3;
    pub const PRIVATE: Self = Self::L4;

    #[must_use]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    #[must_use]
    pub const fn is_silent(self) -> bool {
        matches!(self, Self::Silent)
    }

    /// Whether a signal at `level` passes this threshold.
    #[must_use]
    pub const fn permits(self, level: Self) -> bool {
        !level.is_silent() && level.as_i8() <= self.as_i8()
    }
}

impl TryFrom<i8> for Level {
    type Error = ModelError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            ..0 => Ok(Self::Silent),
            0 => Ok(Self::L0),
            1 => Ok(Self::L1),
            2 => Ok(Self::L2),
            3 => Ok(Self::L3),
            4 => Ok(Self::L4),
            _ => Err(ModelError::InvalidLevel { value, context: None }),
        }
    }
}

impl From<Level> for i8 {
    fn from(level: Level) -> Self {
        level.as_i8()
    }
}
