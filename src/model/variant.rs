//! Candidate schedule variants produced by the pattern generator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::shift::ShiftBlock;
use crate::Id;

/// Named family of shift layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Traditional,
    Flexible,
    Staggered,
    SplitShift,
    Compressed,
    PartTime,
    PeakFocus,
    WeekendFocus,
}

impl PatternType {
    pub const ALL: [PatternType; 8] = [
        PatternType::Traditional,
        PatternType::Flexible,
        PatternType::Staggered,
        PatternType::SplitShift,
        PatternType::Compressed,
        PatternType::PartTime,
        PatternType::PeakFocus,
        PatternType::WeekendFocus,
    ];

    /// Implementation-simplicity base on the 0-10 scale used by the scoring
    /// engine; split shifts are the hardest to roll out.
    pub fn simplicity_base(self) -> f64 {
        match self {
            PatternType::Traditional => 10.0,
            PatternType::Flexible => 8.0,
            PatternType::PartTime => 7.5,
            PatternType::Staggered => 7.0,
            PatternType::PeakFocus => 6.5,
            PatternType::Compressed => 6.0,
            PatternType::WeekendFocus => 5.5,
            PatternType::SplitShift => 4.0,
        }
    }

    /// Same scale stretched to 0-100 for the generator's fitness term.
    pub fn complexity_factor(self) -> f64 {
        self.simplicity_base() * 10.0
    }
}

/// Metrics cached on a variant as the pipeline enriches it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub fitness: f64,
    pub coverage_improvement: f64,
    pub cost_impact: f64,
    pub implementation_complexity: f64,
    pub service_level_projection: f64,
    pub projected_gaps: Option<f64>,
    pub projected_weekly_cost: Option<f64>,
}

/// One candidate schedule. Immutable once scored: evolution and the
/// enrichment stages copy a variant and assign a fresh `variant_id` rather
/// than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleVariant {
    pub variant_id: Id,
    pub pattern_type: PatternType,
    pub generation: u32,
    pub blocks: Vec<ShiftBlock>,
    pub metrics: VariantMetrics,
    pub constraint_violations: Vec<String>,
}

impl ScheduleVariant {
    pub fn new(variant_id: impl Into<Id>, pattern_type: PatternType, blocks: Vec<ShiftBlock>) -> Self {
        Self {
            variant_id: variant_id.into(),
            pattern_type,
            generation: 0,
            blocks,
            metrics: VariantMetrics {
                service_level_projection: 80.0,
                ..VariantMetrics::default()
            },
            constraint_violations: Vec::new(),
        }
    }

    /// Distinct employees appearing in this variant, in id order.
    pub fn employee_ids(&self) -> BTreeSet<&str> {
        self.blocks.iter().map(|b| b.employee_id.as_str()).collect()
    }

    /// Union of the blocks' required skills.
    pub fn required_skills(&self) -> BTreeSet<&str> {
        self.blocks
            .iter()
            .flat_map(|b| b.required_skills.iter().map(String::as_str))
            .collect()
    }

    pub fn covers_hour(&self, hour: u8) -> bool {
        self.blocks.iter().any(|b| b.covers_hour(hour))
    }

    /// Agents on shift during each hour of the day.
    pub fn hour_coverage(&self) -> [u32; 24] {
        let mut histogram = [0u32; 24];
        for block in &self.blocks {
            for (hour, count) in histogram.iter_mut().enumerate() {
                if block.covers_hour(hour as u8) {
                    *count += 1;
                }
            }
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    #[test]
    fn simplicity_bases_match_archetype_ordering() {
        assert_eq!(PatternType::Traditional.simplicity_base(), 10.0);
        assert_eq!(PatternType::SplitShift.simplicity_base(), 4.0);
        // traditional minus split is the 6-point spread the scorer relies on
        assert!(
            PatternType::Traditional.simplicity_base() - PatternType::SplitShift.simplicity_base()
                >= 6.0
        );
    }

    #[test]
    fn employee_ids_are_deduplicated_and_ordered() {
        let variant = ScheduleVariant::new(
            "VAR_000",
            PatternType::Traditional,
            vec![
                ShiftBlock::from_hours("E2", date(), 8, 16),
                ShiftBlock::from_hours("E1", date(), 8, 16),
                ShiftBlock::from_hours("E1", date(), 16, 20),
            ],
        );
        let ids: Vec<_> = variant.employee_ids().into_iter().collect();
        assert_eq!(ids, vec!["E1", "E2"]);
    }

    #[test]
    fn hour_coverage_counts_concurrent_blocks() {
        let variant = ScheduleVariant::new(
            "VAR_001",
            PatternType::Staggered,
            vec![
                ShiftBlock::from_hours("E1", date(), 8, 16),
                ShiftBlock::from_hours("E2", date(), 10, 18),
            ],
        );
        let histogram = variant.hour_coverage();
        assert_eq!(histogram[9], 1);
        assert_eq!(histogram[12], 2);
        assert_eq!(histogram[17], 1);
        assert_eq!(histogram[19], 0);
    }
}
