//! Gap severity map produced by the analyzer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Slot;

/// Severity bands over the interval gap percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    Critical,
    High,
    Medium,
    Low,
    Covered,
}

impl GapSeverity {
    /// Classifies a gap percentage into its band.
    pub fn classify(gap_pct: f64) -> Self {
        if gap_pct >= 0.20 {
            GapSeverity::Critical
        } else if gap_pct >= 0.10 {
            GapSeverity::High
        } else if gap_pct >= 0.05 {
            GapSeverity::Medium
        } else if gap_pct > 0.0 {
            GapSeverity::Low
        } else {
            GapSeverity::Covered
        }
    }

    /// Weight in the coverage-score average.
    pub fn weight(self) -> f64 {
        match self {
            GapSeverity::Critical => 1.0,
            GapSeverity::High => 0.7,
            GapSeverity::Medium => 0.4,
            GapSeverity::Low => 0.2,
            GapSeverity::Covered => 0.0,
        }
    }
}

/// Gap analysis for one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalGap {
    pub interval: Slot,
    pub required: u32,
    pub scheduled: u32,
    pub gap_count: u32,
    pub gap_pct: f64,
    pub severity: GapSeverity,
    pub cost_impact: f64,
    /// Linear approximation of service-level loss, in `[0, 1]`.
    pub sl_impact: f64,
}

/// Complete gap severity map for one run.
///
/// The report is a pure function of its inputs: it carries no timestamps or
/// timing metadata, so repeated analysis of identical inputs is identical.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GapReport {
    pub interval_gaps: Vec<IntervalGap>,
    pub total_gaps: u32,
    pub average_gap_pct: f64,
    pub critical_intervals: Vec<Slot>,
    /// Intervals at high or critical severity; the generator's peak-focus
    /// seeding and the scorer's peak-coverage component read these.
    pub peak_intervals: Vec<Slot>,
    /// Severity-weighted coverage score in `[0, 100]`.
    pub coverage_score: f64,
    /// Ordered improvement recommendations, at most five.
    pub recommendations: Vec<String>,
    pub severity_distribution: BTreeMap<GapSeverity, usize>,
    /// Worst intervals by cost impact, at most five.
    pub cost_hotspots: Vec<CostHotspot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostHotspot {
    pub interval: Slot,
    pub cost_impact: f64,
}

impl GapReport {
    /// An empty report scores full coverage.
    pub fn empty() -> Self {
        Self {
            coverage_score: 100.0,
            ..Self::default()
        }
    }

    /// Hours of day ranked by total gap count, worst first. Used by
    /// peak-focused seeding.
    pub fn peak_hours(&self, limit: usize) -> Vec<u8> {
        let mut by_hour: BTreeMap<u8, u32> = BTreeMap::new();
        for gap in &self.interval_gaps {
            if gap.gap_count > 0 {
                *by_hour.entry(gap.interval.hour()).or_default() += gap.gap_count;
            }
        }
        let mut hours: Vec<(u8, u32)> = by_hour.into_iter().collect();
        // Worst gap first; hour ascending breaks ties deterministically
        hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hours.into_iter().take(limit).map(|(h, _)| h).collect()
    }
}
