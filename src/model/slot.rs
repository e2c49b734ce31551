//! Fixed-width half-open interval on the daily grid.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Minutes in one day; `end_min` of a slot may equal this for "24:00".
pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Slot label must be 'HH:MM' or 'HH:MM-HH:MM', got '{0}'")]
    BadLabel(String),

    #[error("Slot must have start < end, got {start}..{end} (minutes)")]
    EmptyWindow { start: u16, end: u16 },

    #[error("Slot exceeds the daily grid: {0} minutes past midnight")]
    PastMidnight(u16),
}

/// Half-open window `[start, end)` on a day's grid, labeled `"HH:MM-HH:MM"`.
///
/// Slots order by start time, so maps keyed by `Slot` (forecasts, coverage
/// requirements) iterate in grid order. The grid width is uniform within one
/// run (commonly 15 or 60 minutes) but `Slot` itself carries its own width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    start_min: u16,
    end_min: u16,
}

impl Slot {
    /// Creates `[start_min, end_min)` in minutes since midnight.
    pub fn new(start_min: u16, end_min: u16) -> Result<Self, SlotError> {
        if start_min >= end_min {
            return Err(SlotError::EmptyWindow {
                start: start_min,
                end: end_min,
            });
        }
        if end_min > MINUTES_PER_DAY {
            return Err(SlotError::PastMidnight(end_min - MINUTES_PER_DAY));
        }
        Ok(Self { start_min, end_min })
    }

    /// One-hour slot starting at `hour`.
    pub fn hourly(hour: u8) -> Self {
        let start = u16::from(hour) * 60;
        Self {
            start_min: start,
            end_min: start + 60,
        }
    }

    /// Quarter-hour slot starting at `hour:minute`.
    pub fn quarter(hour: u8, minute: u8) -> Self {
        let start = u16::from(hour) * 60 + u16::from(minute);
        Self {
            start_min: start,
            end_min: start + 15,
        }
    }

    pub const fn start_min(&self) -> u16 {
        self.start_min
    }

    pub const fn end_min(&self) -> u16 {
        self.end_min
    }

    pub const fn width_min(&self) -> u16 {
        self.end_min - self.start_min
    }

    /// Slot width in fractional hours.
    pub fn width_hours(&self) -> f64 {
        f64::from(self.width_min()) / 60.0
    }

    /// Hour of day this slot starts in.
    pub const fn hour(&self) -> u8 {
        (self.start_min / 60) as u8
    }

    /// Returns true if `minute` ∈ `[start, end)`.
    pub const fn contains_min(&self, minute: u16) -> bool {
        self.start_min <= minute && minute < self.end_min
    }

    /// Half-open overlap with an arbitrary `[start, end)` minute range.
    pub const fn overlaps_range(&self, start_min: u16, end_min: u16) -> bool {
        self.start_min < end_min && start_min < self.end_min
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

fn fmt_hhmm(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn parse_hhmm(s: &str) -> Option<u16> {
    let (h, m) = s.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h > 24 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", fmt_hhmm(self.start_min), fmt_hhmm(self.end_min))
    }
}

impl FromStr for Slot {
    type Err = SlotError;

    /// Parses `"HH:MM-HH:MM"`, or a bare `"HH:MM"` as a one-hour slot (the
    /// form hourly forecasts arrive in).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SlotError::BadLabel(s.to_string());
        match s.split_once('-') {
            Some((a, b)) => {
                let start = parse_hhmm(a.trim()).ok_or_else(bad)?;
                let end = parse_hhmm(b.trim()).ok_or_else(bad)?;
                Slot::new(start, end)
            }
            None => {
                let start = parse_hhmm(s.trim()).ok_or_else(bad)?;
                Slot::new(start, start + 60)
            }
        }
    }
}

impl serde::Serialize for Slot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Slot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
