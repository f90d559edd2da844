//! Mode settings and the caller-side request set.

use std::fmt;
use std::str::FromStr;

use dt8852_frame::{CMD_FREQUENCY_WEIGHTING, CMD_RANGE, CMD_RECORDING, CMD_TIME_WEIGHTING};

/// The four independently acknowledged configuration attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeCategory {
    Range,
    TimeWeighting,
    FrequencyWeighting,
    Recording,
}

impl ModeCategory {
    pub const ALL: [ModeCategory; 4] = [
        ModeCategory::Range,
        ModeCategory::TimeWeighting,
        ModeCategory::FrequencyWeighting,
        ModeCategory::Recording,
    ];

    /// Frame kind used to command this category. Mode acks echo it back.
    pub fn command_kind(self) -> u8 {
        match self {
            ModeCategory::Range => CMD_RANGE,
            ModeCategory::TimeWeighting => CMD_TIME_WEIGHTING,
            ModeCategory::FrequencyWeighting => CMD_FREQUENCY_WEIGHTING,
            ModeCategory::Recording => CMD_RECORDING,
        }
    }

    pub fn from_command_kind(kind: u8) -> Option<Self> {
        match kind {
            CMD_RANGE => Some(ModeCategory::Range),
            CMD_TIME_WEIGHTING => Some(ModeCategory::TimeWeighting),
            CMD_FREQUENCY_WEIGHTING => Some(ModeCategory::FrequencyWeighting),
            CMD_RECORDING => Some(ModeCategory::Recording),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ModeCategory::Range => "range",
            ModeCategory::TimeWeighting => "time_weighting",
            ModeCategory::FrequencyWeighting => "frequency_weighting",
            ModeCategory::Recording => "recording",
        }
    }
}

/// Measurement range in dB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Range {
    /// Automatic full range, 30-130 dB.
    R30To130,
    R30To80,
    R50To100,
    R60To110,
    R80To130,
}

impl Range {
    pub fn code(self) -> u8 {
        match self {
            Range::R30To130 => 0,
            Range::R30To80 => 1,
            Range::R50To100 => 2,
            Range::R60To110 => 3,
            Range::R80To130 => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Range::R30To130),
            1 => Some(Range::R30To80),
            2 => Some(Range::R50To100),
            3 => Some(Range::R60To110),
            4 => Some(Range::R80To130),
            _ => None,
        }
    }

    /// Lower and upper bound in dB.
    pub fn bounds(self) -> (u8, u8) {
        match self {
            Range::R30To130 => (30, 130),
            Range::R30To80 => (30, 80),
            Range::R50To100 => (50, 100),
            Range::R60To110 => (60, 110),
            Range::R80To130 => (80, 130),
        }
    }
}

/// Time weighting of the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWeighting {
    Fast,
    Slow,
}

impl TimeWeighting {
    pub fn code(self) -> u8 {
        match self {
            TimeWeighting::Fast => 0,
            TimeWeighting::Slow => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TimeWeighting::Fast),
            1 => Some(TimeWeighting::Slow),
            _ => None,
        }
    }
}

/// Frequency weighting curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyWeighting {
    DbA,
    DbC,
}

impl FrequencyWeighting {
    pub fn code(self) -> u8 {
        match self {
            FrequencyWeighting::DbA => 0,
            FrequencyWeighting::DbC => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FrequencyWeighting::DbA),
            1 => Some(FrequencyWeighting::DbC),
            _ => None,
        }
    }
}

/// On-board recording state.
///
/// # Hazard
///
/// Toggling recording from the host while the meter is mid-session can
/// corrupt the sessions stored on the device. Once that happens a full
/// download is no longer possible until the meter's storage is cleared on
/// the device itself. The driver cannot observe the device's recording state
/// reliably and therefore never blocks such a request; prefer starting and
/// stopping recordings with the meter's own button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingState {
    Recording,
    NotRecording,
}

impl RecordingState {
    pub fn code(self) -> u8 {
        match self {
            RecordingState::NotRecording => 0,
            RecordingState::Recording => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RecordingState::NotRecording),
            1 => Some(RecordingState::Recording),
            _ => None,
        }
    }
}

/// One configuration attribute-value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeSetting {
    Range(Range),
    TimeWeighting(TimeWeighting),
    FrequencyWeighting(FrequencyWeighting),
    /// See the hazard note on [`RecordingState`].
    Recording(RecordingState),
}

impl ModeSetting {
    pub fn category(&self) -> ModeCategory {
        match self {
            ModeSetting::Range(_) => ModeCategory::Range,
            ModeSetting::TimeWeighting(_) => ModeCategory::TimeWeighting,
            ModeSetting::FrequencyWeighting(_) => ModeCategory::FrequencyWeighting,
            ModeSetting::Recording(_) => ModeCategory::Recording,
        }
    }

    /// Value byte on the wire.
    pub fn code(&self) -> u8 {
        match self {
            ModeSetting::Range(v) => v.code(),
            ModeSetting::TimeWeighting(v) => v.code(),
            ModeSetting::FrequencyWeighting(v) => v.code(),
            ModeSetting::Recording(v) => v.code(),
        }
    }

    /// Rebuild a setting from its category kind and value byte.
    pub fn from_wire(category_kind: u8, code: u8) -> Option<Self> {
        match ModeCategory::from_command_kind(category_kind)? {
            ModeCategory::Range => Range::from_code(code).map(ModeSetting::Range),
            ModeCategory::TimeWeighting => {
                TimeWeighting::from_code(code).map(ModeSetting::TimeWeighting)
            }
            ModeCategory::FrequencyWeighting => {
                FrequencyWeighting::from_code(code).map(ModeSetting::FrequencyWeighting)
            }
            ModeCategory::Recording => RecordingState::from_code(code).map(ModeSetting::Recording),
        }
    }
}

impl From<Range> for ModeSetting {
    fn from(value: Range) -> Self {
        ModeSetting::Range(value)
    }
}

impl From<TimeWeighting> for ModeSetting {
    fn from(value: TimeWeighting) -> Self {
        ModeSetting::TimeWeighting(value)
    }
}

impl From<FrequencyWeighting> for ModeSetting {
    fn from(value: FrequencyWeighting) -> Self {
        ModeSetting::FrequencyWeighting(value)
    }
}

impl From<RecordingState> for ModeSetting {
    fn from(value: RecordingState) -> Self {
        ModeSetting::Recording(value)
    }
}

impl fmt::Display for ModeSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSetting::Range(r) => {
                let (lo, hi) = r.bounds();
                write!(f, "range={lo}-{hi}dB")
            }
            ModeSetting::TimeWeighting(TimeWeighting::Fast) => f.write_str("time=fast"),
            ModeSetting::TimeWeighting(TimeWeighting::Slow) => f.write_str("time=slow"),
            ModeSetting::FrequencyWeighting(FrequencyWeighting::DbA) => f.write_str("weighting=dBA"),
            ModeSetting::FrequencyWeighting(FrequencyWeighting::DbC) => f.write_str("weighting=dBC"),
            ModeSetting::Recording(RecordingState::Recording) => f.write_str("recording=on"),
            ModeSetting::Recording(RecordingState::NotRecording) => f.write_str("recording=off"),
        }
    }
}

/// A mode value string that did not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what} `{input}` (expected one of: {expected})")]
pub struct ParseModeError {
    what: &'static str,
    input: String,
    expected: &'static str,
}

impl ParseModeError {
    fn new(what: &'static str, input: &str, expected: &'static str) -> Self {
        Self {
            what,
            input: input.to_string(),
            expected,
        }
    }
}

impl FromStr for Range {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "30-130" | "auto" => Ok(Range::R30To130),
            "30-80" => Ok(Range::R30To80),
            "50-100" => Ok(Range::R50To100),
            "60-110" => Ok(Range::R60To110),
            "80-130" => Ok(Range::R80To130),
            _ => Err(ParseModeError::new(
                "range",
                s,
                "30-130, 30-80, 50-100, 60-110, 80-130",
            )),
        }
    }
}

impl FromStr for TimeWeighting {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "f" => Ok(TimeWeighting::Fast),
            "slow" | "s" => Ok(TimeWeighting::Slow),
            _ => Err(ParseModeError::new("time weighting", s, "fast, slow")),
        }
    }
}

impl FromStr for FrequencyWeighting {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "dba" => Ok(FrequencyWeighting::DbA),
            "c" | "dbc" => Ok(FrequencyWeighting::DbC),
            _ => Err(ParseModeError::new("frequency weighting", s, "a, c")),
        }
    }
}

impl FromStr for RecordingState {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "start" | "recording" => Ok(RecordingState::Recording),
            "off" | "stop" | "not-recording" => Ok(RecordingState::NotRecording),
            _ => Err(ParseModeError::new("recording state", s, "on, off")),
        }
    }
}

/// Caller-owned set of settings still waiting for acknowledgment.
///
/// The device session never tracks this; callers push what they send and
/// shrink the set as [`Token::ModeAck`](crate::Token::ModeAck) tokens arrive.
/// At most one setting per category is pending at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeRequestSet {
    pending: Vec<ModeSetting>,
}

impl ModeRequestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting, replacing any pending setting of the same category in place.
    pub fn push(&mut self, setting: impl Into<ModeSetting>) {
        let setting = setting.into();
        match self
            .pending
            .iter_mut()
            .find(|p| p.category() == setting.category())
        {
            Some(slot) => *slot = setting,
            None => self.pending.push(setting),
        }
    }

    /// Remove the pending setting matching an acknowledgment.
    ///
    /// Returns `false` if nothing of that exact value was pending (a stale or
    /// unsolicited ack); the set is left unchanged in that case.
    pub fn acknowledge(&mut self, acked: &ModeSetting) -> bool {
        match self.pending.iter().position(|p| p == acked) {
            Some(pos) => {
                self.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn pending_for(&self, category: ModeCategory) -> Option<&ModeSetting> {
        self.pending.iter().find(|p| p.category() == category)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn as_slice(&self) -> &[ModeSetting] {
        &self.pending
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModeSetting> {
        self.pending.iter()
    }
}

impl<S: Into<ModeSetting>> FromIterator<S> for ModeRequestSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ModeRequestSet::new();
        for setting in iter {
            set.push(setting);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ModeRequestSet {
    type Item = &'a ModeSetting;
    type IntoIter = std::slice::Iter<'a, ModeSetting>;

    fn into_iter(self) -> Self::IntoIter {
        self.pending.iter()
    }
}
