//! Shift blocks: one employee's contiguous assignment on one day.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::slot::{Slot, MINUTES_PER_DAY};
use crate::Id;

/// Night window is 22:00-06:00.
pub const NIGHT_START_MIN: u16 = 22 * 60;
pub const NIGHT_END_MIN: u16 = 6 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftPart {
    Whole,
    FirstHalf,
    SecondHalf,
}

/// A scheduled block of work.
///
/// Times are minutes since midnight local to the schedule's territory;
/// `end_min` may exceed `MINUTES_PER_DAY` for shifts that wrap past midnight
/// (e.g. 22:00-06:00 is `1320..1800`). A block stands for a weekly template
/// row repeated `days_per_week` times unless the variant carries one block
/// per calendar date, in which case `days_per_week` is 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftBlock {
    pub employee_id: Id,
    pub date: NaiveDate,
    pub start_min: u16,
    pub end_min: u16,
    pub break_minutes: u16,
    pub days_per_week: u8,
    pub assigned_site: Option<Id>,
    pub shift_part: Option<ShiftPart>,
    pub required_skills: BTreeSet<Id>,
    /// Set by staggered seeding: this block intentionally overlaps a peer.
    pub overlap_shift: bool,
    /// Set by compressed seeding: part of a long-day/short-week layout.
    pub compressed_schedule: bool,
    /// Rest since the employee's previous shift, when the loader knows it.
    pub rest_hours_before: Option<f64>,
}

impl ShiftBlock {
    pub fn new(employee_id: impl Into<Id>, date: NaiveDate, start_min: u16, end_min: u16) -> Self {
        debug_assert!(start_min < end_min, "shift must have start < end");
        Self {
            employee_id: employee_id.into(),
            date,
            start_min,
            end_min,
            break_minutes: 0,
            days_per_week: 5,
            assigned_site: None,
            shift_part: None,
            required_skills: BTreeSet::new(),
            overlap_shift: false,
            compressed_schedule: false,
            rest_hours_before: None,
        }
    }

    /// Convenience constructor from whole hours (`8..16` is 08:00-16:00).
    pub fn from_hours(employee_id: impl Into<Id>, date: NaiveDate, start_hour: u8, end_hour: u8) -> Self {
        Self::new(
            employee_id,
            date,
            u16::from(start_hour) * 60,
            u16::from(end_hour) * 60,
        )
    }

    pub fn with_break(mut self, minutes: u16) -> Self {
        self.break_minutes = minutes;
        self
    }

    pub fn with_days_per_week(mut self, days: u8) -> Self {
        self.days_per_week = days;
        self
    }

    pub fn with_site(mut self, site: impl Into<Id>) -> Self {
        self.assigned_site = Some(site.into());
        self
    }

    pub fn with_part(mut self, part: ShiftPart) -> Self {
        self.shift_part = Some(part);
        self
    }

    pub fn with_required_skills(mut self, skills: impl IntoIterator<Item = impl Into<Id>>) -> Self {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rest_hours_before(mut self, hours: f64) -> Self {
        self.rest_hours_before = Some(hours);
        self
    }

    pub const fn duration_minutes(&self) -> u16 {
        self.end_min - self.start_min
    }

    /// Paid minutes: duration net of the unpaid break.
    pub const fn worked_minutes(&self) -> u16 {
        self.duration_minutes().saturating_sub(self.break_minutes)
    }

    pub fn daily_hours(&self) -> f64 {
        f64::from(self.worked_minutes()) / 60.0
    }

    /// Weekly hours this block stands for.
    pub fn weekly_hours(&self) -> f64 {
        self.daily_hours() * f64::from(self.days_per_week)
    }

    /// Weekly hours beyond the 40-hour norm.
    pub fn overtime_hours_week(&self) -> f64 {
        (self.weekly_hours() - 40.0).max(0.0)
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Minutes of this shift inside the 22:00-06:00 night window, per day.
    pub fn night_minutes(&self) -> u16 {
        // Windows on an unwrapped minute axis: [0,360) same-day morning,
        // [1320,1440) late evening, [1440,1800) next-day morning.
        let windows = [
            (0u16, NIGHT_END_MIN),
            (NIGHT_START_MIN, MINUTES_PER_DAY),
            (MINUTES_PER_DAY, MINUTES_PER_DAY + NIGHT_END_MIN),
        ];
        windows
            .iter()
            .map(|&(ws, we)| {
                let lo = self.start_min.max(ws);
                let hi = self.end_min.min(we);
                hi.saturating_sub(lo)
            })
            .sum()
    }

    /// Returns true if the shift covers any part of hour `hour` (0-23).
    pub fn covers_hour(&self, hour: u8) -> bool {
        let h_start = u16::from(hour) * 60;
        self.overlaps_minutes(h_start, h_start + 60)
    }

    /// Returns true if the shift overlaps the slot's window.
    pub fn covers_slot(&self, slot: &Slot) -> bool {
        self.overlaps_minutes(slot.start_min(), slot.end_min())
    }

    /// Half-open overlap against `[start, end)` on the daily axis, folding a
    /// wrapped tail back onto the next morning.
    fn overlaps_minutes(&self, start: u16, end: u16) -> bool {
        if self.start_min < end && start < self.end_min.min(MINUTES_PER_DAY) {
            return true;
        }
        if self.end_min > MINUTES_PER_DAY {
            let tail_end = self.end_min - MINUTES_PER_DAY;
            if start < tail_end && 0 < end {
                return true;
            }
        }
        false
    }

    /// Time-overlap with another block on the same calendar date.
    pub fn overlaps(&self, other: &ShiftBlock) -> bool {
        self.date == other.date && self.start_min < other.end_min && other.start_min < self.end_min
    }

    /// `"HH:MM-HH:MM"` label for reports.
    pub fn window_label(&self) -> String {
        let fmt = |m: u16| format!("{:02}:{:02}", (m / 60) % 24, m % 60);
        format!("{}-{}", fmt(self.start_min), fmt(self.end_min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    #[test]
    fn derived_hours() {
        let b = ShiftBlock::from_hours("E1", date(), 8, 16).with_break(30);
        assert_eq!(b.duration_minutes(), 480);
        assert_eq!(b.worked_minutes(), 450);
        assert_eq!(b.daily_hours(), 7.5);
        assert_eq!(b.weekly_hours(), 37.5);
        assert_eq!(b.overtime_hours_week(), 0.0);
    }

    #[test]
    fn overtime_past_forty_hours() {
        let b = ShiftBlock::from_hours("E1", date(), 8, 18); // 10h x 5d
        assert_eq!(b.weekly_hours(), 50.0);
        assert_eq!(b.overtime_hours_week(), 10.0);
    }

    #[test]
    fn weekend_detection() {
        let sat = NaiveDate::from_ymd_opt(2024, 7, 13).unwrap();
        assert!(ShiftBlock::from_hours("E1", sat, 8, 16).is_weekend());
        assert!(!ShiftBlock::from_hours("E1", date(), 8, 16).is_weekend());
    }

    #[test]
    fn night_minutes_for_day_shift_is_zero() {
        let b = ShiftBlock::from_hours("E1", date(), 8, 16);
        assert_eq!(b.night_minutes(), 0);
    }

    #[test]
    fn night_minutes_for_overnight_shift() {
        // 22:00-06:00 wraps midnight: full eight hours are night work
        let b = ShiftBlock::new("E1", date(), 1320, 1800);
        assert_eq!(b.night_minutes(), 480);
    }

    #[test]
    fn night_minutes_for_early_start() {
        // 04:00-12:00 touches the morning end of the window
        let b = ShiftBlock::from_hours("E1", date(), 4, 12);
        assert_eq!(b.night_minutes(), 120);
    }

    #[test]
    fn hour_coverage_is_half_open() {
        let b = ShiftBlock::from_hours("E1", date(), 8, 16);
        assert!(b.covers_hour(8));
        assert!(b.covers_hour(15));
        assert!(!b.covers_hour(16));
        assert!(!b.covers_hour(7));
    }

    #[test]
    fn overnight_shift_covers_next_morning() {
        let b = ShiftBlock::new("E1", date(), 1320, 1800);
        assert!(b.covers_hour(23));
        assert!(b.covers_hour(3));
        assert!(!b.covers_hour(7));
    }

    #[test]
    fn same_day_overlap() {
        let a = ShiftBlock::from_hours("E1", date(), 8, 16);
        let b = ShiftBlock::from_hours("E1", date(), 12, 20);
        let c = ShiftBlock::from_hours("E1", date(), 16, 20);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // back-to-back is not a conflict
    }

    #[test]
    fn window_label_wraps_midnight() {
        let b = ShiftBlock::new("E1", date(), 1320, 1800);
        assert_eq!(b.window_label(), "22:00-06:00");
    }
}
