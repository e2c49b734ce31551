//! Bulk application: conflict detection, resource and budget checks, risk
//! classification, and the rollback plan.

use std::collections::BTreeSet;

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use super::plan::{rollback_plan, RollbackProcedure};
use super::OptimizationMode;
use crate::model::{Employee, ScheduleVariant};
use crate::score::RiskLevel;
use crate::Id;

/// Caller-supplied context for a bulk application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkConstraints {
    /// The pool the variants will draw staff from.
    pub employee_pool: Vec<Employee>,
    /// Ceiling on the summed cost impact of all variants.
    pub budget_ceiling: f64,
}

impl Default for BulkConstraints {
    fn default() -> Self {
        Self {
            employee_pool: Vec::new(),
            budget_ceiling: 1000.0,
        }
    }
}

/// One employee double-booked across variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeConflict {
    pub employee_id: Id,
    pub interval: String,
    pub variant_ids: Vec<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub employee_conflicts: Vec<EmployeeConflict>,
    /// Connected groups of mutually conflicting blocks.
    pub conflict_clusters: usize,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.employee_conflicts.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub all_skills_covered: bool,
    /// Skills the variants need but no pool employee holds.
    pub training_needs: Vec<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub total_cost_change: f64,
    pub ceiling: f64,
    pub within_budget: bool,
    pub labor_cost_change: f64,
    pub overtime_change: f64,
    pub training_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedImpact {
    pub coverage_improvement: f64,
    pub cost_savings: f64,
    pub employees_affected: usize,
    pub average_complexity: f64,
}

/// Result of applying multiple compatible suggestions at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub combined_impact: CombinedImpact,
    pub risk: RiskLevel,
    pub risk_factors: u8,
    pub implementation_timeline: String,
    pub timeline_feasible: bool,
    pub conflict_report: ConflictReport,
    pub resource_report: ResourceReport,
    pub budget_report: BudgetReport,
    pub rollback_plan: Vec<RollbackProcedure>,
}

pub(crate) fn bulk_apply(
    variants: &[ScheduleVariant],
    constraints: &BulkConstraints,
    mode: OptimizationMode,
) -> BulkOperationResult {
    let conflict_report = detect_conflicts(variants);
    let resource_report = check_resources(variants, &constraints.employee_pool);
    let combined_impact = combined_impact(variants);
    let budget_report = budget_impact(variants, constraints.budget_ceiling);
    let (implementation_timeline, timeline_feasible) =
        timeline(mode, combined_impact.average_complexity);

    let mut risk_factors = 0u8;
    if conflict_report.has_conflicts() {
        risk_factors += 2;
    }
    if !resource_report.all_skills_covered {
        risk_factors += 2;
    }
    if combined_impact.average_complexity < 30.0 {
        risk_factors += 1;
    }
    if combined_impact.employees_affected > 30 {
        risk_factors += 1;
    }
    let risk = match risk_factors {
        0 => RiskLevel::Low,
        1 | 2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };

    BulkOperationResult {
        combined_impact,
        risk,
        risk_factors,
        implementation_timeline,
        timeline_feasible,
        conflict_report,
        resource_report,
        budget_report,
        rollback_plan: rollback_plan(),
    }
}

/// Two scheduled blocks conflict when they share an employee and overlap in
/// time. Blocks are graph nodes; conflict edges join them, and connected
/// components give the cluster count.
fn detect_conflicts(variants: &[ScheduleVariant]) -> ConflictReport {
    let blocks: Vec<(usize, usize)> = variants
        .iter()
        .enumerate()
        .flat_map(|(vi, v)| (0..v.blocks.len()).map(move |bi| (vi, bi)))
        .collect();

    let mut union: UnionFind<usize> = UnionFind::new(blocks.len());
    let mut conflicts = Vec::new();
    let mut in_conflict: BTreeSet<usize> = BTreeSet::new();

    for i in 0..blocks.len() {
        for j in i + 1..blocks.len() {
            let (vi, bi) = blocks[i];
            let (vj, bj) = blocks[j];
            if vi == vj {
                continue;
            }
            let a = &variants[vi].blocks[bi];
            let b = &variants[vj].blocks[bj];
            if a.employee_id == b.employee_id && a.overlaps(b) {
                union.union(i, j);
                in_conflict.insert(i);
                in_conflict.insert(j);
                let overlap_start = a.start_min.max(b.start_min);
                let overlap_end = a.end_min.min(b.end_min);
                let fmt = |m: u16| format!("{:02}:{:02}", (m / 60) % 24, m % 60);
                conflicts.push(EmployeeConflict {
                    employee_id: a.employee_id.clone(),
                    interval: format!("{}-{}", fmt(overlap_start), fmt(overlap_end)),
                    variant_ids: vec![
                        variants[vi].variant_id.clone(),
                        variants[vj].variant_id.clone(),
                    ],
                });
            }
        }
    }

    let clusters: BTreeSet<usize> = in_conflict.iter().map(|&i| union.find(i)).collect();
    ConflictReport {
        employee_conflicts: conflicts,
        conflict_clusters: clusters.len(),
    }
}

/// Every skill required anywhere in the variants must exist in the pool.
fn check_resources(variants: &[ScheduleVariant], pool: &[Employee]) -> ResourceReport {
    let available: BTreeSet<&str> = pool
        .iter()
        .flat_map(|e| e.skills.iter().map(String::as_str))
        .collect();
    let required: BTreeSet<&str> = variants
        .iter()
        .flat_map(|v| v.required_skills())
        .collect();

    let training_needs: Vec<Id> = required
        .difference(&available)
        .map(|s| s.to_string())
        .collect();
    ResourceReport {
        all_skills_covered: training_needs.is_empty(),
        training_needs,
    }
}

fn combined_impact(variants: &[ScheduleVariant]) -> CombinedImpact {
    let employees: BTreeSet<&str> = variants.iter().flat_map(|v| v.employee_ids()).collect();
    let coverage_improvement = variants
        .iter()
        .map(|v| v.metrics.coverage_improvement)
        .sum();
    let cost_savings = variants
        .iter()
        .map(|v| v.metrics.cost_impact)
        .sum::<f64>()
        .abs();
    let average_complexity = if variants.is_empty() {
        50.0
    } else {
        variants
            .iter()
            .map(|v| v.metrics.implementation_complexity)
            .sum::<f64>()
            / variants.len() as f64
    };

    CombinedImpact {
        coverage_improvement,
        cost_savings,
        employees_affected: employees.len(),
        average_complexity,
    }
}

fn budget_impact(variants: &[ScheduleVariant], ceiling: f64) -> BudgetReport {
    let total: f64 = variants.iter().map(|v| v.metrics.cost_impact).sum();
    BudgetReport {
        total_cost_change: total,
        ceiling,
        within_budget: total <= ceiling,
        labor_cost_change: total * 0.7,
        overtime_change: total * 0.2,
        training_cost: total * 0.1,
    }
}

/// Immediate rollouts only make sense for simple (high-score) schedules.
fn timeline(mode: OptimizationMode, average_complexity: f64) -> (String, bool) {
    match mode {
        OptimizationMode::ImmediateFull => ("1 week".to_string(), average_complexity > 70.0),
        OptimizationMode::Phased => ("3 weeks".to_string(), true),
        OptimizationMode::Pilot => ("4 weeks".to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PatternType, ShiftBlock};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn variant(id: &str, blocks: Vec<ShiftBlock>) -> ScheduleVariant {
        let mut v = ScheduleVariant::new(id, PatternType::Traditional, blocks);
        v.metrics.implementation_complexity = 80.0;
        v
    }

    // ── conflict detection ────────────────────────────────────────────

    #[test]
    fn overlapping_blocks_for_one_employee_conflict() {
        let a = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let b = variant("VAR_001", vec![ShiftBlock::from_hours("E1", date(), 12, 20)]);
        let report = detect_conflicts(&[a, b]);
        assert_eq!(report.employee_conflicts.len(), 1);
        assert_eq!(report.conflict_clusters, 1);
        let conflict = &report.employee_conflicts[0];
        assert_eq!(conflict.employee_id, "E1");
        assert_eq!(conflict.interval, "12:00-16:00");
        assert_eq!(conflict.variant_ids, vec!["VAR_000", "VAR_001"]);
    }

    #[test]
    fn different_employees_never_conflict() {
        let a = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let b = variant("VAR_001", vec![ShiftBlock::from_hours("E2", date(), 8, 16)]);
        assert!(!detect_conflicts(&[a, b]).has_conflicts());
    }

    #[test]
    fn back_to_back_blocks_do_not_conflict() {
        let a = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 12)]);
        let b = variant("VAR_001", vec![ShiftBlock::from_hours("E1", date(), 12, 16)]);
        assert!(!detect_conflicts(&[a, b]).has_conflicts());
    }

    #[test]
    fn chained_conflicts_form_one_cluster() {
        let a = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 12)]);
        let b = variant("VAR_001", vec![ShiftBlock::from_hours("E1", date(), 10, 14)]);
        let c = variant("VAR_002", vec![ShiftBlock::from_hours("E1", date(), 13, 17)]);
        let report = detect_conflicts(&[a, b, c]);
        assert_eq!(report.employee_conflicts.len(), 2);
        assert_eq!(report.conflict_clusters, 1);
    }

    // ── resources and budget ──────────────────────────────────────────

    #[test]
    fn missing_skills_become_training_needs() {
        let v = variant(
            "VAR_000",
            vec![ShiftBlock::from_hours("E1", date(), 8, 16).with_required_skills(["welding"])],
        );
        let pool = vec![Employee::new("E1").with_skill("voice")];
        let report = check_resources(&[v], &pool);
        assert!(!report.all_skills_covered);
        assert_eq!(report.training_needs, vec!["welding".to_string()]);
    }

    #[test]
    fn budget_ceiling_is_enforced() {
        let mut a = variant("VAR_000", vec![]);
        a.metrics.cost_impact = 700.0;
        let mut b = variant("VAR_001", vec![]);
        b.metrics.cost_impact = 600.0;
        let report = budget_impact(&[a, b], 1000.0);
        assert!(!report.within_budget);
        assert_eq!(report.total_cost_change, 1300.0);
    }

    // ── risk and timeline ─────────────────────────────────────────────

    #[test]
    fn conflict_free_simple_bulk_is_low_risk() {
        let a = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let result = bulk_apply(&[a], &BulkConstraints::default(), OptimizationMode::Phased);
        assert_eq!(result.risk, RiskLevel::Low);
        assert_eq!(result.risk_factors, 0);
        assert_eq!(result.implementation_timeline, "3 weeks");
        assert!(result.timeline_feasible);
        assert_eq!(result.rollback_plan.len(), 3);
    }

    #[test]
    fn conflicts_raise_risk_to_at_least_medium() {
        let a = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        let b = variant("VAR_001", vec![ShiftBlock::from_hours("E1", date(), 12, 20)]);
        let result = bulk_apply(&[a, b], &BulkConstraints::default(), OptimizationMode::Phased);
        assert!(result.risk >= RiskLevel::Medium);
        assert!(result.conflict_report.has_conflicts());
    }

    #[test]
    fn stacked_factors_reach_high_risk() {
        let a = variant(
            "VAR_000",
            vec![ShiftBlock::from_hours("E1", date(), 8, 16).with_required_skills(["welding"])],
        );
        let mut b = variant("VAR_001", vec![ShiftBlock::from_hours("E1", date(), 12, 20)]);
        b.metrics.implementation_complexity = 10.0;
        let mut a2 = a.clone();
        a2.metrics.implementation_complexity = 10.0;
        let result = bulk_apply(
            &[a2, b],
            &BulkConstraints::default(),
            OptimizationMode::Phased,
        );
        // conflicts (+2), missing skills (+2), low complexity (+1)
        assert_eq!(result.risk, RiskLevel::High);
        assert!(result.risk_factors >= 3);
    }

    #[test]
    fn immediate_mode_needs_simple_schedules() {
        let mut simple = variant("VAR_000", vec![ShiftBlock::from_hours("E1", date(), 8, 16)]);
        simple.metrics.implementation_complexity = 90.0;
        let result = bulk_apply(
            &[simple.clone()],
            &BulkConstraints::default(),
            OptimizationMode::ImmediateFull,
        );
        assert_eq!(result.implementation_timeline, "1 week");
        assert!(result.timeline_feasible);

        simple.metrics.implementation_complexity = 40.0;
        let result = bulk_apply(
            &[simple],
            &BulkConstraints::default(),
            OptimizationMode::ImmediateFull,
        );
        assert!(!result.timeline_feasible);
    }
}
