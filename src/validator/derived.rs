//! Derived per-employee quantities, computed once per variant and memoized.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{ScheduleVariant, ShiftBlock};
use crate::Id;

/// Quantities the predicates ask for, computed from one employee's blocks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EmployeeDerived {
    pub weekly_hours: f64,
    pub max_daily_hours: f64,
    /// Worst single-day hours beyond the 8-hour day.
    pub daily_overtime: f64,
    /// Weekly hours beyond the 40-hour norm.
    pub weekly_overtime: f64,
    /// Shortest rest between shifts; infinite when nothing constrains it.
    pub min_rest_hours: f64,
    pub consecutive_days: u32,
}

/// Computes derived quantities for every employee in the variant.
pub(crate) fn derive_all(variant: &ScheduleVariant) -> BTreeMap<Id, EmployeeDerived> {
    let mut by_employee: BTreeMap<Id, Vec<&ShiftBlock>> = BTreeMap::new();
    for block in &variant.blocks {
        by_employee
            .entry(block.employee_id.clone())
            .or_default()
            .push(block);
    }
    by_employee
        .into_iter()
        .map(|(id, blocks)| (id, derive_one(&blocks)))
        .collect()
}

fn derive_one(blocks: &[&ShiftBlock]) -> EmployeeDerived {
    let weekly_hours: f64 = blocks.iter().map(|b| b.weekly_hours()).sum();

    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for block in blocks {
        *daily.entry(block.date).or_default() += block.daily_hours();
    }
    let max_daily_hours = daily.values().copied().fold(0.0, f64::max);

    EmployeeDerived {
        weekly_hours,
        max_daily_hours,
        daily_overtime: (max_daily_hours - 8.0).max(0.0),
        weekly_overtime: (weekly_hours - 40.0).max(0.0),
        min_rest_hours: min_rest_hours(blocks),
        consecutive_days: consecutive_days(blocks),
    }
}

/// Shortest rest this employee gets between shifts.
///
/// Three sources, tightest wins: the loader-supplied `rest_hours_before`,
/// the gap between adjacent dated blocks, and the implied daily repeat of a
/// weekly template block (24h minus the daily span).
fn min_rest_hours(blocks: &[&ShiftBlock]) -> f64 {
    let mut min_rest = f64::INFINITY;

    for block in blocks {
        if let Some(rest) = block.rest_hours_before {
            min_rest = min_rest.min(rest);
        }
        if block.days_per_week > 1 {
            let span_hours = f64::from(block.duration_minutes()) / 60.0;
            min_rest = min_rest.min(24.0 - span_hours);
        }
    }

    // Adjacent dated blocks: rest from one end to the next start.
    let mut sorted: Vec<&&ShiftBlock> = blocks.iter().collect();
    sorted.sort_by_key(|b| (b.date, b.start_min));
    for pair in sorted.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let day_gap = (next.date - prev.date).num_days();
        if !(0..=2).contains(&day_gap) {
            continue;
        }
        let rest_min = day_gap * 1440 + i64::from(next.start_min) - i64::from(prev.end_min);
        if rest_min >= 0 {
            min_rest = min_rest.min(rest_min as f64 / 60.0);
        }
    }

    min_rest
}

/// Longest run of consecutive scheduled dates; a weekly template block
/// implies `days_per_week` consecutive days.
fn consecutive_days(blocks: &[&ShiftBlock]) -> u32 {
    let template_days = blocks
        .iter()
        .map(|b| u32::from(b.days_per_week))
        .max()
        .unwrap_or(0);

    let mut dates: Vec<NaiveDate> = blocks.iter().map(|b| b.date).collect();
    dates.sort();
    dates.dedup();

    let mut longest = 1u32;
    let mut run = 1u32;
    for pair in dates.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }
    if dates.len() > 1 {
        longest.max(template_days.min(7))
    } else {
        template_days.min(7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PatternType;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn derive(blocks: Vec<ShiftBlock>) -> BTreeMap<Id, EmployeeDerived> {
        derive_all(&ScheduleVariant::new("VAR_000", PatternType::Traditional, blocks))
    }

    #[test]
    fn weekly_hours_sum_template_blocks() {
        let derived = derive(vec![ShiftBlock::from_hours("E1", date(15), 8, 16)]);
        let e1 = &derived["E1"];
        assert_eq!(e1.weekly_hours, 40.0);
        assert_eq!(e1.weekly_overtime, 0.0);
        assert_eq!(e1.max_daily_hours, 8.0);
    }

    #[test]
    fn overtime_appears_past_the_norms() {
        // 13h x 5d = 65h/week, 5h daily overtime
        let derived = derive(vec![ShiftBlock::from_hours("E1", date(15), 6, 19)]);
        let e1 = &derived["E1"];
        assert_eq!(e1.weekly_hours, 65.0);
        assert_eq!(e1.weekly_overtime, 25.0);
        assert_eq!(e1.daily_overtime, 5.0);
    }

    #[test]
    fn template_block_implies_daily_repeat_rest() {
        // 13-hour span repeated daily leaves 11h rest
        let derived = derive(vec![ShiftBlock::from_hours("E1", date(15), 6, 19)]);
        assert_eq!(derived["E1"].min_rest_hours, 11.0);
    }

    #[test]
    fn stored_rest_hint_wins_when_tighter() {
        let derived = derive(vec![
            ShiftBlock::from_hours("E1", date(15), 8, 16).with_rest_hours_before(8.0)
        ]);
        assert_eq!(derived["E1"].min_rest_hours, 8.0);
    }

    #[test]
    fn dated_blocks_compute_cross_day_rest() {
        // Ends 20:00 on the 15th, starts 06:00 on the 16th: 10h rest
        let derived = derive(vec![
            ShiftBlock::from_hours("E1", date(15), 12, 20).with_days_per_week(1),
            ShiftBlock::from_hours("E1", date(16), 6, 14).with_days_per_week(1),
        ]);
        assert_eq!(derived["E1"].min_rest_hours, 10.0);
    }

    #[test]
    fn consecutive_days_from_template() {
        let derived = derive(vec![ShiftBlock::from_hours("E1", date(15), 8, 16).with_days_per_week(6)]);
        assert_eq!(derived["E1"].consecutive_days, 6);
    }

    #[test]
    fn consecutive_days_from_dated_runs() {
        let blocks: Vec<ShiftBlock> = [15, 16, 17, 19, 20]
            .iter()
            .map(|&d| ShiftBlock::from_hours("E1", date(d), 8, 16).with_days_per_week(1))
            .collect();
        let derived = derive(blocks);
        assert_eq!(derived["E1"].consecutive_days, 3);
    }

    #[test]
    fn employees_are_independent() {
        let derived = derive(vec![
            ShiftBlock::from_hours("E1", date(15), 8, 16),
            ShiftBlock::from_hours("E2", date(15), 6, 19),
        ]);
        assert_eq!(derived["E1"].weekly_overtime, 0.0);
        assert!(derived["E2"].weekly_overtime > 0.0);
    }
}
