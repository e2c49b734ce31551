//! Score breakdown types and the per-variant scoring result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Id;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeightError {
    #[error("scoring weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// Weights of the four scoring components. They must sum to 1.0; component
/// point scales are `weight x 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub coverage: f64,
    pub cost: f64,
    pub compliance: f64,
    pub simplicity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            coverage: 0.40,
            cost: 0.30,
            compliance: 0.20,
            simplicity: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Rejects reweightings that break the sum-to-one invariant.
    pub fn validated(self) -> Result<Self, WeightError> {
        let sum = self.coverage + self.cost + self.compliance + self.simplicity;
        if (sum - 1.0).abs() > 1e-9 {
            Err(WeightError::BadSum(sum))
        } else {
            Ok(self)
        }
    }

    pub fn coverage_max(&self) -> f64 {
        self.coverage * 100.0
    }

    pub fn cost_max(&self) -> f64 {
        self.cost * 100.0
    }

    pub fn compliance_max(&self) -> f64 {
        self.compliance * 100.0
    }

    pub fn simplicity_max(&self) -> f64 {
        self.simplicity * 100.0
    }
}

/// Sub-component scores feeding the four weighted components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubComponents {
    pub gap_reduction: f64,
    pub peak_coverage: f64,
    pub skill_match: f64,
    pub overtime_reduction: f64,
    pub cost_reduction: f64,
    pub labor_compliance: f64,
    pub preference_satisfaction: f64,
    pub pattern_regularity: f64,
}

/// Four weighted components plus their sub-scores; the total is their sum
/// and lies in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub coverage_score: f64,
    pub cost_score: f64,
    pub compliance_score: f64,
    pub simplicity_score: f64,
    pub total_score: f64,
    pub sub_components: SubComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationLevel {
    Implement,
    Monitor,
    PlanAccordingly,
}

/// Projected outcomes of implementing a variant, in percent except for the
/// confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutcomes {
    pub coverage_improvement: f64,
    pub cost_savings: f64,
    pub service_level_improvement: f64,
    pub employee_satisfaction: f64,
    pub implementation_confidence: f64,
}

impl Default for ExpectedOutcomes {
    fn default() -> Self {
        Self {
            coverage_improvement: 15.0,
            cost_savings: 10.0,
            service_level_improvement: 5.0,
            employee_satisfaction: 68.0,
            implementation_confidence: 85.0,
        }
    }
}

/// Complete score for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationScore {
    pub variant_id: Id,
    pub overall_score: f64,
    pub score_breakdown: ScoreBreakdown,
    /// Dense 1-based rank; assigned after sorting.
    pub rank: u32,
    pub recommendation_level: RecommendationLevel,
    pub risk: RiskLevel,
    /// Human-readable window, e.g. `"2-3 weeks"`.
    pub implementation_window: String,
    pub expected_outcomes: ExpectedOutcomes,
}
