//! Financial impact types: per-employee breakdowns and run aggregates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostComponent {
    Base,
    Overtime,
    WeekendPremium,
    NightPremium,
    SkillPremium,
    Benefits,
    Travel,
    Accommodation,
    Coordination,
}

impl CostComponent {
    pub const ALL: [CostComponent; 9] = [
        CostComponent::Base,
        CostComponent::Overtime,
        CostComponent::WeekendPremium,
        CostComponent::NightPremium,
        CostComponent::SkillPremium,
        CostComponent::Benefits,
        CostComponent::Travel,
        CostComponent::Accommodation,
        CostComponent::Coordination,
    ];
}

/// Solution quality of the cost analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostQuality {
    /// Direct per-employee calculation.
    Exact,
    /// Default rates were used because no financial profiles were available.
    Estimated,
    /// The assignment model could not satisfy coverage and budget.
    Infeasible,
}

/// Weekly cost decomposition for one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCost {
    pub employee_id: Id,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub breakdown: BTreeMap<CostComponent, f64>,
    pub total: f64,
    /// Cost per productive hour.
    pub efficiency: f64,
}

impl EmployeeCost {
    pub fn component(&self, component: CostComponent) -> f64 {
        self.breakdown.get(&component).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyIndicators {
    pub cost_per_hour: f64,
    pub average_employee_cost: f64,
    pub overtime_pct: f64,
    pub premium_pct: f64,
    /// 0-100; anchored on a 50/h baseline cost per productive hour.
    pub utilization_efficiency: f64,
}

/// Complete financial impact assessment for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialImpact {
    pub total_weekly_cost: f64,
    pub by_component: BTreeMap<CostComponent, f64>,
    pub per_employee: Vec<EmployeeCost>,
    /// Coefficient of variation of per-employee totals, in percent.
    pub cost_variation_pct: f64,
    pub efficiency: EfficiencyIndicators,
    /// Ordered savings opportunities, at most five.
    pub savings_opportunities: Vec<String>,
    pub quality: CostQuality,
    /// Remediation hint; set when `quality` is `Infeasible`.
    pub recommendation: Option<String>,
    pub processing_time_ms: f64,
}

impl FinancialImpact {
    pub fn component_total(&self, component: CostComponent) -> f64 {
        self.by_component.get(&component).copied().unwrap_or(0.0)
    }

    /// Zero-filled impact for an empty variant; no division anywhere.
    pub fn zero(quality: CostQuality) -> Self {
        Self {
            total_weekly_cost: 0.0,
            by_component: CostComponent::ALL.iter().map(|&c| (c, 0.0)).collect(),
            per_employee: Vec::new(),
            cost_variation_pct: 0.0,
            efficiency: EfficiencyIndicators::default(),
            savings_opportunities: Vec::new(),
            quality,
            recommendation: None,
            processing_time_ms: 0.0,
        }
    }

    /// The infeasible marker returned by the assignment mode.
    pub fn infeasible(recommendation: impl Into<String>) -> Self {
        let mut impact = Self::zero(CostQuality::Infeasible);
        impact.recommendation = Some(recommendation.into());
        impact
    }
}

/// Savings opportunities per the documented thresholds, worst first.
pub(crate) fn savings_opportunities(
    per_employee: &[EmployeeCost],
    by_component: &BTreeMap<CostComponent, f64>,
    total: f64,
) -> Vec<String> {
    if total <= 0.0 {
        return Vec::new();
    }
    let share = |component: CostComponent| -> f64 {
        by_component.get(&component).copied().unwrap_or(0.0) / total * 100.0
    };
    let mut out = Vec::new();

    let overtime_pct = share(CostComponent::Overtime);
    if overtime_pct > 15.0 {
        out.push(format!(
            "Reduce overtime costs: {overtime_pct:.1}% of total budget"
        ));
    }

    let weekend_pct = share(CostComponent::WeekendPremium);
    if weekend_pct > 10.0 {
        out.push(format!(
            "Optimize weekend coverage: {weekend_pct:.1}% premium costs"
        ));
    }

    let skill_pct = share(CostComponent::SkillPremium);
    if skill_pct > 20.0 {
        out.push(format!(
            "Review skill assignments: {skill_pct:.1}% in skill premiums"
        ));
    }

    if per_employee.len() > 1 {
        let mean = total / per_employee.len() as f64;
        let high_cost = per_employee
            .iter()
            .filter(|c| c.total > mean * 1.3)
            .count();
        if high_cost as f64 > per_employee.len() as f64 * 0.3 {
            out.push(format!(
                "Address cost variance: {high_cost} high-cost assignments"
            ));
        }
    }

    let reducible = by_component.get(&CostComponent::Overtime).unwrap_or(&0.0) * 0.5
        + by_component
            .get(&CostComponent::WeekendPremium)
            .unwrap_or(&0.0)
            * 0.3;
    let predicted = reducible / total;
    if predicted >= 0.10 {
        out.push(format!(
            "Potential savings: {:.1}% through re-optimization",
            predicted * 100.0
        ));
    }

    out.truncate(5);
    out
}
