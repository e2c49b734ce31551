//! Desired improvement deltas guiding generation and scoring.

use serde::{Deserialize, Serialize};

/// Target deltas for one run, in percent. These guide the evolutionary
/// fitness and the expected-outcome projections; they are goals, not
/// constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationTargets {
    pub coverage_improvement_pct: f64,
    pub cost_reduction_pct: f64,
    pub service_level_improvement_pct: f64,
    pub employee_satisfaction_pct: f64,
}

impl Default for OptimizationTargets {
    fn default() -> Self {
        Self {
            coverage_improvement_pct: 15.0,
            cost_reduction_pct: 10.0,
            service_level_improvement_pct: 5.0,
            employee_satisfaction_pct: 75.0,
        }
    }
}
