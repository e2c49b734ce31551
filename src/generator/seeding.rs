//! Deterministic archetype seeding of the initial population.

use super::GeneratorConstraints;
use crate::gap::GapReport;
use crate::model::{PatternType, ShiftBlock, ShiftPart};

/// Archetype mix for the 50-variant initial population.
pub(crate) const PATTERN_COUNTS: [(PatternType, usize); 8] = [
    (PatternType::Traditional, 10),
    (PatternType::Flexible, 10),
    (PatternType::Staggered, 8),
    (PatternType::SplitShift, 6),
    (PatternType::Compressed, 6),
    (PatternType::PartTime, 5),
    (PatternType::PeakFocus, 3),
    (PatternType::WeekendFocus, 2),
];

/// Staggered start hours cycling across blocks.
const STAGGER_STARTS: [u16; 8] = [7, 8, 9, 10, 11, 14, 15, 16];

/// Derives the block list for one seeded variant. `index` is the variant's
/// position within its archetype group and drives the deterministic
/// intra-archetype variation (rotation/phase).
pub(crate) fn seed_blocks(
    pattern: PatternType,
    index: usize,
    current: &[ShiftBlock],
    gaps: &GapReport,
    constraints: &GeneratorConstraints,
) -> Vec<ShiftBlock> {
    match pattern {
        PatternType::Traditional => traditional(current),
        PatternType::Flexible => flexible(current, gaps, constraints),
        PatternType::Staggered => staggered(current, index),
        PatternType::SplitShift => split_shift(current),
        PatternType::Compressed => compressed(current),
        PatternType::PartTime => part_time(current, index),
        PatternType::PeakFocus => peak_focus(current, gaps, constraints),
        PatternType::WeekendFocus => weekend_focus(current),
    }
}

/// Aligns every block to the standard 08:00-16:00 / 16:00-24:00 boundaries.
fn traditional(current: &[ShiftBlock]) -> Vec<ShiftBlock> {
    current
        .iter()
        .map(|block| {
            let mut b = block.clone();
            if b.start_min < 16 * 60 {
                b.start_min = 8 * 60;
                b.end_min = 16 * 60;
            } else {
                b.start_min = 16 * 60;
                b.end_min = 24 * 60;
            }
            b
        })
        .collect()
}

/// Moves start times to one hour before the earliest gap.
fn flexible(current: &[ShiftBlock], gaps: &GapReport, constraints: &GeneratorConstraints) -> Vec<ShiftBlock> {
    let earliest_gap_hour = gaps
        .interval_gaps
        .iter()
        .filter(|g| g.gap_count > 0)
        .map(|g| g.interval.hour())
        .min();

    current
        .iter()
        .map(|block| {
            let mut b = block.clone();
            if let Some(hour) = earliest_gap_hour {
                let start = u16::from(hour.max(constraints.earliest_start_hour + 1) - 1) * 60;
                b.start_min = start;
                b.end_min = start + 8 * 60;
            }
            b
        })
        .collect()
}

/// Overlapping starts cycling through [`STAGGER_STARTS`], rotated by the
/// variant index so each staggered seed covers a different phase.
fn staggered(current: &[ShiftBlock], index: usize) -> Vec<ShiftBlock> {
    current
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let mut b = block.clone();
            let start_hour = STAGGER_STARTS[(i + index) % STAGGER_STARTS.len()];
            b.start_min = start_hour * 60;
            b.end_min = (start_hour + 8) * 60;
            b.overlap_shift = true;
            b
        })
        .collect()
}

/// Splits each shift into 08:00-12:00 and 14:00-18:00 halves.
fn split_shift(current: &[ShiftBlock]) -> Vec<ShiftBlock> {
    let mut blocks = Vec::with_capacity(current.len() * 2);
    for block in current {
        let mut first = block.clone();
        first.start_min = 8 * 60;
        first.end_min = 12 * 60;
        first.shift_part = Some(ShiftPart::FirstHalf);

        let mut second = block.clone();
        second.start_min = 14 * 60;
        second.end_min = 18 * 60;
        second.shift_part = Some(ShiftPart::SecondHalf);

        blocks.push(first);
        blocks.push(second);
    }
    blocks
}

/// Ten-hour days, four days per week.
fn compressed(current: &[ShiftBlock]) -> Vec<ShiftBlock> {
    current
        .iter()
        .map(|block| {
            let mut b = block.clone();
            b.end_min = (b.start_min + 10 * 60).min(22 * 60);
            b.days_per_week = 4;
            b.compressed_schedule = true;
            b
        })
        .collect()
}

/// Alternating morning/afternoon four-hour shifts; `index` flips the phase.
fn part_time(current: &[ShiftBlock], index: usize) -> Vec<ShiftBlock> {
    current
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let mut b = block.clone();
            if (i + index) % 2 == 0 {
                b.start_min = 8 * 60;
                b.end_min = 12 * 60;
            } else {
                b.start_min = 14 * 60;
                b.end_min = 18 * 60;
            }
            b
        })
        .collect()
}

/// Aligns shifts to the hours with the highest gap counts.
fn peak_focus(current: &[ShiftBlock], gaps: &GapReport, constraints: &GeneratorConstraints) -> Vec<ShiftBlock> {
    let peak_hours = gaps.peak_hours(4);
    current
        .iter()
        .map(|block| {
            let mut b = block.clone();
            if let Some(&first_peak) = peak_hours.iter().min() {
                let start_hour = first_peak.max(constraints.earliest_start_hour + 1) - 1;
                let end_hour = (start_hour + 8).min(constraints.latest_end_hour);
                b.start_min = u16::from(start_hour) * 60;
                b.end_min = u16::from(end_hour) * 60;
            }
            b
        })
        .collect()
}

/// Shortens weekday shifts to six hours and stretches weekend shifts to ten.
fn weekend_focus(current: &[ShiftBlock]) -> Vec<ShiftBlock> {
    current
        .iter()
        .map(|block| {
            let mut b = block.clone();
            let hours: u16 = if b.is_weekend() { 10 } else { 6 };
            b.end_min = (b.start_min + hours * 60).min(24 * 60);
            b
        })
        .collect()
}
