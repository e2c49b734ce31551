//! Implementation and rollback plans.

use serde::{Deserialize, Serialize};

use super::OptimizationMode;

/// Stage-phased rollout plan with success criteria and monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub approach: String,
    pub phases: Vec<String>,
    pub success_criteria: Vec<String>,
    pub monitoring_plan: Vec<String>,
}

pub(crate) fn build(mode: OptimizationMode) -> ImplementationPlan {
    let (approach, phases) = match mode {
        OptimizationMode::ImmediateFull => (
            "Apply all suggestions simultaneously",
            vec!["Week 1: Full implementation".to_string()],
        ),
        OptimizationMode::Phased => (
            "Implement in stages",
            vec![
                "Week 1: High-priority suggestions".to_string(),
                "Week 2: Medium-priority adjustments".to_string(),
                "Week 3: Final optimizations".to_string(),
            ],
        ),
        OptimizationMode::Pilot => (
            "Pilot with limited scope",
            vec![
                "Week 1-2: Select pilot department".to_string(),
                "Week 3-4: Run pilot program".to_string(),
                "Week 5-6: Evaluate and scale".to_string(),
            ],
        ),
    };

    ImplementationPlan {
        approach: approach.to_string(),
        phases,
        success_criteria: vec![
            "Service level improvement >5%".to_string(),
            "Cost reduction >10%".to_string(),
            "Employee satisfaction maintained".to_string(),
        ],
        monitoring_plan: vec![
            "Real-time service level tracking".to_string(),
            "Daily cost monitoring".to_string(),
            "Weekly employee feedback".to_string(),
        ],
    }
}

/// One rollback trigger with its detection method and recovery steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackProcedure {
    pub trigger: String,
    pub detection_method: String,
    pub recovery_time: String,
    pub steps: Vec<String>,
}

/// The three standard rollback triggers.
pub(crate) fn rollback_plan() -> Vec<RollbackProcedure> {
    vec![
        RollbackProcedure {
            trigger: "Service level degradation".to_string(),
            detection_method: "Real-time monitoring".to_string(),
            recovery_time: "1 hour".to_string(),
            steps: vec![
                "Activate monitoring alerts".to_string(),
                "Revert to previous schedule".to_string(),
                "Notify stakeholders".to_string(),
            ],
        },
        RollbackProcedure {
            trigger: "Employee satisfaction drop".to_string(),
            detection_method: "Feedback monitoring".to_string(),
            recovery_time: "1 day".to_string(),
            steps: vec![
                "Collect employee feedback".to_string(),
                "Identify specific issues".to_string(),
                "Adjust problematic assignments".to_string(),
            ],
        },
        RollbackProcedure {
            trigger: "Cost overrun".to_string(),
            detection_method: "Budget tracking".to_string(),
            recovery_time: "1 week".to_string(),
            steps: vec![
                "Analyze cost drivers".to_string(),
                "Reduce overtime assignments".to_string(),
                "Optimize shift patterns".to_string(),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phased_plan_has_three_weeks() {
        let plan = build(OptimizationMode::Phased);
        assert_eq!(plan.phases.len(), 3);
        assert!(plan.approach.contains("stages"));
    }

    #[test]
    fn pilot_plan_selects_runs_and_evaluates() {
        let plan = build(OptimizationMode::Pilot);
        assert!(plan.phases[0].contains("pilot department"));
        assert!(plan.phases[2].contains("Evaluate"));
    }

    #[test]
    fn rollback_covers_the_three_standard_triggers() {
        let plan = rollback_plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].recovery_time, "1 hour");
        assert_eq!(plan[1].recovery_time, "1 day");
        assert_eq!(plan[2].recovery_time, "1 week");
        assert!(plan.iter().all(|p| p.steps.len() == 3));
    }
}
