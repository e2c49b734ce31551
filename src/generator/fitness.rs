//! Fitness evaluation for candidate variants.

use std::collections::BTreeMap;

use super::GeneratorConstraints;
use crate::gap::GapReport;
use crate::model::{OptimizationTargets, ScheduleVariant, ShiftBlock};

/// Weighted-sum fitness: coverage 0.40, cost 0.30, service level 0.20,
/// complexity 0.10, each on a 0-100 scale, minus 10 per hard violation.
pub(crate) const COVERAGE_WEIGHT: f64 = 0.40;
pub(crate) const COST_WEIGHT: f64 = 0.30;
pub(crate) const SERVICE_LEVEL_WEIGHT: f64 = 0.20;
pub(crate) const COMPLEXITY_WEIGHT: f64 = 0.10;
const VIOLATION_PENALTY: f64 = 10.0;

/// Scores `variant` in place, filling its cached metrics and hard-violation
/// list.
pub(crate) fn evaluate(
    variant: &mut ScheduleVariant,
    gaps: &GapReport,
    constraints: &GeneratorConstraints,
    targets: &OptimizationTargets,
) {
    let coverage = coverage_score(variant, gaps, targets);
    let cost = cost_score(variant);
    let service_level = service_level_projection(variant, gaps);
    let complexity = complexity_score(variant);
    let violations = hard_violations(variant, constraints);

    let weighted = coverage * COVERAGE_WEIGHT
        + cost * COST_WEIGHT
        + service_level * SERVICE_LEVEL_WEIGHT
        + complexity * COMPLEXITY_WEIGHT;
    let fitness = (weighted - violations.len() as f64 * VIOLATION_PENALTY).max(0.0);

    variant.metrics.fitness = fitness;
    variant.metrics.coverage_improvement = coverage;
    variant.metrics.cost_impact = 100.0 - cost;
    variant.metrics.service_level_projection = service_level;
    variant.metrics.implementation_complexity = complexity;
    variant.constraint_violations = violations;
}

/// Coverage score 0-100: base from scheduled hours plus a bonus per gap
/// interval the variant reaches. An ambitious coverage target amplifies the
/// per-gap bonus so the search leans harder into gap-closing layouts.
fn coverage_score(
    variant: &ScheduleVariant,
    gaps: &GapReport,
    targets: &OptimizationTargets,
) -> f64 {
    let total_hours: f64 = variant.blocks.iter().map(ShiftBlock::daily_hours).sum();
    let base = (total_hours * 2.0).min(100.0);

    let gap_bonus = 5.0 * (targets.coverage_improvement_pct / 15.0).clamp(0.5, 2.0);
    let mut bonus = 0.0;
    for gap in gaps.interval_gaps.iter().filter(|g| g.gap_count > 0) {
        if variant.covers_hour(gap.interval.hour()) {
            bonus += gap_bonus;
        }
    }
    (base + bonus).min(100.0)
}

/// Cost-efficiency score 0-100, higher is cheaper. Long days past 18:00 read
/// as overtime; split parts add handling overhead.
fn cost_score(variant: &ScheduleVariant) -> f64 {
    let total_hours: f64 = variant.blocks.iter().map(ShiftBlock::daily_hours).sum();
    let mut overtime_penalty = 0.0;
    let mut handling_penalty = 0.0;
    for block in &variant.blocks {
        if block.end_min > 18 * 60 {
            overtime_penalty += 10.0;
        }
        if block.shift_part.is_some() {
            handling_penalty += 5.0;
        }
    }
    let base = (100.0 - total_hours * 1.5).max(10.0);
    (base - overtime_penalty - handling_penalty).clamp(0.0, 100.0)
}

/// Projected service level: 80 base, up to +15 for covering the gap
/// intervals, capped at 95.
fn service_level_projection(variant: &ScheduleVariant, gaps: &GapReport) -> f64 {
    let open: Vec<_> = gaps
        .interval_gaps
        .iter()
        .filter(|g| g.gap_count > 0)
        .collect();
    if open.is_empty() {
        return 80.0;
    }
    let covered = open
        .iter()
        .filter(|g| variant.covers_hour(g.interval.hour()))
        .count();
    let ratio = covered as f64 / open.len() as f64;
    (80.0 + ratio * 15.0).min(95.0)
}

/// Implementation-simplicity score 0-100 (higher is simpler): archetype
/// factor minus per-block layout penalties.
pub(crate) fn complexity_score(variant: &ScheduleVariant) -> f64 {
    let mut score = variant.pattern_type.complexity_factor();
    for block in &variant.blocks {
        if block.overlap_shift {
            score -= 5.0;
        }
        if block.shift_part.is_some() {
            score -= 10.0;
        }
        if block.compressed_schedule {
            score -= 5.0;
        }
    }
    score.clamp(0.0, 100.0)
}

/// Hard-constraint violations that penalize fitness directly: over-long
/// shifts and employees scheduled below the weekly coverage floor.
fn hard_violations(variant: &ScheduleVariant, constraints: &GeneratorConstraints) -> Vec<String> {
    let mut violations = Vec::new();

    for block in &variant.blocks {
        let hours = block.daily_hours();
        if hours > constraints.max_shift_hours {
            violations.push(format!(
                "Shift exceeds {}-hour limit: {:.1} hours for {}",
                constraints.max_shift_hours, hours, block.employee_id
            ));
        }
    }

    let mut weekly: BTreeMap<&str, f64> = BTreeMap::new();
    for block in &variant.blocks {
        *weekly.entry(block.employee_id.as_str()).or_default() += block.weekly_hours();
    }
    for (employee, hours) in weekly {
        if hours < constraints.min_weekly_hours {
            violations.push(format!(
                "Weekly hours below {:.0}h coverage floor: {:.1} hours for {}",
                constraints.min_weekly_hours, hours, employee
            ));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::GapAnalyzer;
    use crate::model::{PatternType, Slot};
    use chrono::NaiveDate;
    use std::collections::BTreeMap as Map;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn gap_report(entries: &[(u8, u32, u32)]) -> GapReport {
        let forecast: Map<Slot, u32> = entries
            .iter()
            .map(|&(h, req, _)| (Slot::hourly(h), req))
            .collect();
        let schedule: Map<Slot, u32> = entries
            .iter()
            .map(|&(h, _, sch)| (Slot::hourly(h), sch))
            .collect();
        GapAnalyzer::new().analyze(&forecast, &schedule)
    }

    fn variant(blocks: Vec<ShiftBlock>) -> ScheduleVariant {
        ScheduleVariant::new("VAR_000", PatternType::Traditional, blocks)
    }

    #[test]
    fn covering_gaps_beats_missing_them() {
        let gaps = gap_report(&[(10, 5, 2), (11, 5, 2)]);
        let mut covers = variant(vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let mut misses = variant(vec![ShiftBlock::from_hours("E1", date(), 0, 8)]);
        evaluate(&mut covers, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        evaluate(&mut misses, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        assert!(covers.metrics.fitness > misses.metrics.fitness);
    }

    #[test]
    fn overlong_shift_is_a_hard_violation() {
        let gaps = GapReport::empty();
        let mut v = variant(vec![ShiftBlock::from_hours("E1", date(), 6, 19)]); // 13h
        evaluate(&mut v, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        assert_eq!(v.constraint_violations.len(), 1);
        assert!(v.constraint_violations[0].contains("12-hour limit"));
    }

    #[test]
    fn weekly_floor_violation_recorded() {
        let gaps = GapReport::empty();
        // 3h x 5d = 15h, below the 20h floor
        let mut v = variant(vec![ShiftBlock::from_hours("E1", date(), 8, 11)]);
        evaluate(&mut v, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        assert!(v
            .constraint_violations
            .iter()
            .any(|m| m.contains("coverage floor")));
    }

    #[test]
    fn violations_penalize_fitness() {
        let gaps = gap_report(&[(10, 5, 2)]);
        let mut clean = variant(vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let mut dirty = clean.clone();
        dirty.blocks.push(ShiftBlock::from_hours("E2", date(), 6, 19));
        evaluate(&mut clean, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        evaluate(&mut dirty, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        assert!(!dirty.constraint_violations.is_empty());
    }

    #[test]
    fn split_pattern_scores_lower_complexity() {
        use crate::model::ShiftPart;
        let plain = variant(vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let split = ScheduleVariant::new(
            "VAR_001",
            PatternType::SplitShift,
            vec![
                ShiftBlock::from_hours("E1", date(), 8, 12).with_part(ShiftPart::FirstHalf),
                ShiftBlock::from_hours("E1", date(), 14, 18).with_part(ShiftPart::SecondHalf),
            ],
        );
        let plain_score = complexity_score(&plain);
        let split_score = complexity_score(&split);
        assert!(split_score < plain_score);
    }

    #[test]
    fn fitness_never_negative() {
        let gaps = GapReport::empty();
        let mut v = variant(vec![
            ShiftBlock::from_hours("E1", date(), 6, 19),
            ShiftBlock::from_hours("E2", date(), 6, 19),
            ShiftBlock::from_hours("E3", date(), 6, 19),
            ShiftBlock::from_hours("E4", date(), 6, 19),
        ]);
        evaluate(&mut v, &gaps, &GeneratorConstraints::default(), &OptimizationTargets::default());
        assert!(v.metrics.fitness >= 0.0);
    }
}
