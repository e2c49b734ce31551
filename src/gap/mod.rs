//! Gap analysis: required vs. scheduled headcount per interval.

mod report;

pub use report::{CostHotspot, GapReport, GapSeverity, IntervalGap};

use std::collections::BTreeMap;

use crate::model::{CoverageRequirement, Slot};

/// Cost of one uncovered agent-hour, in monetary units.
pub const DEFAULT_UNCOVERED_AGENT_HOURLY_COST: f64 = 35.0;

/// Intervals inside `[10:00, 16:00)` count toward the peak-cluster hint.
const MIDDAY_START_MIN: u16 = 10 * 60;
const MIDDAY_END_MIN: u16 = 16 * 60;

/// Statistical coverage-gap analyzer.
///
/// # Contract
///
/// `analyze` is a pure function: no I/O, no clocks, identical inputs give
/// identical reports. Sparse inputs are fine; intervals missing from the
/// schedule map count as zero scheduled agents. The stage never fails; both
/// inputs empty degrade to [`GapReport::empty`].
#[derive(Debug, Clone)]
pub struct GapAnalyzer {
    hourly_cost: f64,
    hotspot_cost_threshold: f64,
}

impl Default for GapAnalyzer {
    fn default() -> Self {
        Self {
            hourly_cost: DEFAULT_UNCOVERED_AGENT_HOURLY_COST,
            hotspot_cost_threshold: 200.0,
        }
    }
}

impl GapAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the injected cost of an uncovered agent-hour.
    pub fn with_hourly_cost(mut self, cost: f64) -> Self {
        self.hourly_cost = cost;
        self
    }

    pub fn analyze(
        &self,
        forecast: &BTreeMap<Slot, u32>,
        schedule: &BTreeMap<Slot, u32>,
    ) -> GapReport {
        if forecast.is_empty() && schedule.is_empty() {
            return GapReport::empty();
        }

        let mut report = GapReport::empty();

        for (&interval, &required) in forecast {
            let scheduled = schedule.get(&interval).copied().unwrap_or(0);
            let gap_count = required.saturating_sub(scheduled);
            let gap_pct = if required > 0 {
                f64::from(gap_count) / f64::from(required)
            } else {
                0.0
            };
            let severity = GapSeverity::classify(gap_pct);
            let cost_impact = f64::from(gap_count) * self.hourly_cost * interval.width_hours();
            let sl_impact = (gap_pct * 2.0).min(1.0);

            if severity == GapSeverity::Critical {
                report.critical_intervals.push(interval);
            }
            if matches!(severity, GapSeverity::Critical | GapSeverity::High) {
                report.peak_intervals.push(interval);
            }
            *report.severity_distribution.entry(severity).or_default() += 1;
            report.total_gaps += gap_count;
            report.interval_gaps.push(IntervalGap {
                interval,
                required,
                scheduled,
                gap_count,
                gap_pct,
                severity,
                cost_impact,
                sl_impact,
            });
        }

        report.average_gap_pct = mean(report.interval_gaps.iter().map(|g| g.gap_pct));
        report.coverage_score = coverage_score(&report.interval_gaps);
        report.cost_hotspots = cost_hotspots(&report.interval_gaps);
        let recommendations = self.recommendations(&report);
        report.recommendations = recommendations;
        report
    }

    /// Analyzes a forecast expressed as full coverage requirements; the gap
    /// calculation itself only consumes the headcounts.
    pub fn analyze_requirements(
        &self,
        requirements: &BTreeMap<Slot, CoverageRequirement>,
        schedule: &BTreeMap<Slot, u32>,
    ) -> GapReport {
        let forecast: BTreeMap<Slot, u32> = requirements
            .iter()
            .map(|(&slot, req)| (slot, req.required_headcount))
            .collect();
        self.analyze(&forecast, schedule)
    }

    /// Ordered improvement recommendations: urgent criticals first, then
    /// cost hotspots, then the peak-cluster hint, then the reducible total.
    fn recommendations(&self, report: &GapReport) -> Vec<String> {
        let mut out = Vec::new();

        let critical = report.critical_intervals.len();
        if critical > 0 {
            out.push(format!(
                "URGENT: {critical} critical intervals need immediate staffing"
            ));
        }

        let high_cost = report
            .interval_gaps
            .iter()
            .filter(|g| g.cost_impact > self.hotspot_cost_threshold)
            .count();
        if high_cost > 0 {
            out.push(format!(
                "Focus on {high_cost} high-cost intervals for maximum ROI"
            ));
        }

        let midday_gaps = report
            .interval_gaps
            .iter()
            .filter(|g| {
                g.gap_count > 0 && g.interval.overlaps_range(MIDDAY_START_MIN, MIDDAY_END_MIN)
            })
            .count();
        if midday_gaps >= 4 {
            out.push("Consider additional peak-hour staffing or shift overlap".to_string());
        }

        if report.total_gaps > 0 {
            out.push(format!(
                "Potential improvement: {} agent gaps reducible",
                report.total_gaps
            ));
        }

        out.truncate(5);
        out
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Severity-weighted average of `(1 - gap_pct)`, scaled to `[0, 100]`.
/// Intervals with no weight (fully covered) do not dilute the score; a run
/// with only covered intervals scores 100.
fn coverage_score(gaps: &[IntervalGap]) -> f64 {
    let mut total_weight = 0.0;
    let mut weighted_coverage = 0.0;
    for gap in gaps {
        let weight = gap.severity.weight();
        weighted_coverage += (1.0 - gap.gap_pct) * weight;
        total_weight += weight;
    }
    if total_weight == 0.0 {
        100.0
    } else {
        (weighted_coverage / total_weight) * 100.0
    }
}

fn cost_hotspots(gaps: &[IntervalGap]) -> Vec<CostHotspot> {
    let mut hot: Vec<&IntervalGap> = gaps.iter().filter(|g| g.cost_impact > 0.0).collect();
    hot.sort_by(|a, b| {
        b.cost_impact
            .total_cmp(&a.cost_impact)
            .then(a.interval.cmp(&b.interval))
    });
    hot.into_iter()
        .take(5)
        .map(|g| CostHotspot {
            interval: g.interval,
            cost_impact: g.cost_impact,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(entries: &[(u8, u32)]) -> BTreeMap<Slot, u32> {
        entries.iter().map(|&(h, n)| (Slot::hourly(h), n)).collect()
    }

    // ── basic analysis ────────────────────────────────────────────────

    #[test]
    fn fully_covered_schedule_has_no_gaps() {
        let f = forecast(&[(9, 2), (10, 2)]);
        let report = GapAnalyzer::new().analyze(&f, &f.clone());
        assert_eq!(report.total_gaps, 0);
        assert_eq!(report.coverage_score, 100.0);
        assert!(report.critical_intervals.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn missing_schedule_intervals_count_as_zero() {
        let f = forecast(&[(9, 4)]);
        let report = GapAnalyzer::new().analyze(&f, &BTreeMap::new());
        assert_eq!(report.total_gaps, 4);
        let gap = &report.interval_gaps[0];
        assert_eq!(gap.scheduled, 0);
        assert_eq!(gap.gap_pct, 1.0);
        assert_eq!(gap.severity, GapSeverity::Critical);
        assert_eq!(gap.sl_impact, 1.0);
    }

    #[test]
    fn both_inputs_empty_degrade_to_empty_report() {
        let report = GapAnalyzer::new().analyze(&BTreeMap::new(), &BTreeMap::new());
        assert_eq!(report, GapReport::empty());
    }

    #[test]
    fn gap_pct_stays_in_unit_range() {
        // Overstaffed interval saturates at zero gap
        let f = forecast(&[(9, 2)]);
        let s = forecast(&[(9, 5)]);
        let report = GapAnalyzer::new().analyze(&f, &s);
        let gap = &report.interval_gaps[0];
        assert_eq!(gap.gap_count, 0);
        assert_eq!(gap.gap_pct, 0.0);
        assert_eq!(gap.severity, GapSeverity::Covered);
    }

    #[test]
    fn zero_required_is_covered() {
        let f = forecast(&[(3, 0)]);
        let report = GapAnalyzer::new().analyze(&f, &BTreeMap::new());
        assert_eq!(report.interval_gaps[0].severity, GapSeverity::Covered);
        assert_eq!(report.coverage_score, 100.0);
    }

    // ── cost and service-level impacts ────────────────────────────────

    #[test]
    fn cost_impact_scales_with_interval_width() {
        let f: BTreeMap<Slot, u32> = [(Slot::quarter(9, 0), 4u32)].into_iter().collect();
        let report = GapAnalyzer::new().analyze(&f, &BTreeMap::new());
        // 4 agents x 35/h x 0.25h
        assert!((report.interval_gaps[0].cost_impact - 35.0).abs() < 1e-9);
    }

    #[test]
    fn injected_rate_overrides_default() {
        let f = forecast(&[(9, 2)]);
        let report = GapAnalyzer::new()
            .with_hourly_cost(50.0)
            .analyze(&f, &BTreeMap::new());
        assert!((report.interval_gaps[0].cost_impact - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sl_impact_is_twice_gap_pct_capped_at_one() {
        let f = forecast(&[(9, 10)]);
        let s = forecast(&[(9, 7)]);
        let report = GapAnalyzer::new().analyze(&f, &s);
        assert!((report.interval_gaps[0].sl_impact - 0.6).abs() < 1e-9);
    }

    // ── recommendations ───────────────────────────────────────────────

    #[test]
    fn critical_gap_produces_urgent_recommendation() {
        let f = forecast(&[(9, 10)]);
        let s = forecast(&[(9, 5)]);
        let report = GapAnalyzer::new().analyze(&f, &s);
        assert!(report.recommendations[0].starts_with("URGENT"));
    }

    #[test]
    fn midday_cluster_produces_peak_hint() {
        // Six mid-day intervals with mild gaps, but no critical ones
        let f = forecast(&[(10, 20), (11, 20), (12, 20), (13, 20), (14, 20), (15, 20)]);
        let s = forecast(&[(10, 19), (11, 19), (12, 19), (13, 19), (14, 19), (15, 19)]);
        let report = GapAnalyzer::new().analyze(&f, &s);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("peak-hour")));
    }

    #[test]
    fn recommendations_are_capped_at_five() {
        let f = forecast(&[(9, 10), (10, 10), (11, 10), (12, 10), (13, 10), (14, 10)]);
        let report = GapAnalyzer::new().analyze(&f, &BTreeMap::new());
        assert!(report.recommendations.len() <= 5);
    }

    // ── aggregates ────────────────────────────────────────────────────

    #[test]
    fn coverage_score_weighted_by_severity() {
        // One critical (pct 1.0) and one covered interval: covered carries
        // no weight, so the score reflects only the critical interval.
        let f = forecast(&[(9, 4), (10, 4)]);
        let s = forecast(&[(10, 4)]);
        let report = GapAnalyzer::new().analyze(&f, &s);
        assert_eq!(report.coverage_score, 0.0);
    }

    #[test]
    fn hotspots_rank_by_cost_desc() {
        let f = forecast(&[(9, 10), (10, 20)]);
        let report = GapAnalyzer::new().analyze(&f, &BTreeMap::new());
        assert_eq!(report.cost_hotspots.len(), 2);
        assert_eq!(report.cost_hotspots[0].interval, Slot::hourly(10));
    }

    #[test]
    fn requirement_maps_reduce_to_headcounts() {
        use crate::model::Priority;
        let requirements: BTreeMap<Slot, CoverageRequirement> = [(
            Slot::hourly(9),
            CoverageRequirement::headcount(4)
                .with_skill("voice")
                .with_priority(Priority::Critical),
        )]
        .into_iter()
        .collect();
        let report = GapAnalyzer::new().analyze_requirements(&requirements, &BTreeMap::new());
        assert_eq!(report.total_gaps, 4);
        assert_eq!(
            report,
            GapAnalyzer::new().analyze(&forecast(&[(9, 4)]), &BTreeMap::new())
        );
    }

    #[test]
    fn analysis_is_repeatable() {
        let f = forecast(&[(9, 10), (10, 7), (11, 3)]);
        let s = forecast(&[(9, 8), (11, 3)]);
        let analyzer = GapAnalyzer::new();
        assert_eq!(analyzer.analyze(&f, &s), analyzer.analyze(&f, &s));
    }
}
