//! Cost calculation: staffing, overtime, premiums, and mobile-workforce
//! components (travel, accommodation, cross-site coordination).

mod assignment;
mod impact;

pub use assignment::{
    AgentProfile, Assignment, AssignmentPlan, AssignmentProblem, SiteDemand,
};
pub use impact::{
    CostComponent, CostQuality, EfficiencyIndicators, EmployeeCost, FinancialImpact,
};

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Employee, ScheduleVariant, ShiftBlock};
use crate::store::{MetricsStore, PayrollRates};
use crate::Id;

/// Contracted annual hours behind a salary band (52 weeks x 40 hours).
const ANNUAL_HOURS: f64 = 2080.0;

/// Mobile-workforce cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    pub travel_rate_per_km: f64,
    pub accommodation_per_night: f64,
    pub coordination_fee: f64,
    /// Distances past this require overnight accommodation.
    pub overnight_distance_km: f64,
    /// Cost-center spend is capped at this share of the budget.
    pub budget_cap_factor: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            travel_rate_per_km: 0.5,
            accommodation_per_night: 80.0,
            coordination_fee: 15.0,
            overnight_distance_km: 200.0,
            budget_cap_factor: 0.8,
        }
    }
}

/// Pairwise site distances in kilometres; unknown pairs are local.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteCatalog {
    distances: BTreeMap<(Id, Id), f64>,
}

impl SiteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, a: impl Into<Id>, b: impl Into<Id>, km: f64) -> Self {
        self.distances.insert((a.into(), b.into()), km);
        self
    }

    pub fn distance_km(&self, from: &str, to: &str) -> f64 {
        if from == to {
            return 0.0;
        }
        let key = (from.to_string(), to.to_string());
        let rev = (to.to_string(), from.to_string());
        self.distances
            .get(&key)
            .or_else(|| self.distances.get(&rev))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Weekly financial-impact calculator.
///
/// # Contract
///
/// Deterministic; numeric edge cases (empty variant, zero totals) return
/// zero-filled breakdowns without division. Employee financial profiles are
/// used when available; otherwise the payroll defaults apply and the result
/// is tagged [`CostQuality::Estimated`].
#[derive(Debug, Clone)]
pub struct CostCalculator {
    payroll: PayrollRates,
    params: CostParams,
    sites: SiteCatalog,
    profiles: BTreeMap<Id, Employee>,
    defaults_only: bool,
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self {
            payroll: PayrollRates::default(),
            params: CostParams::default(),
            sites: SiteCatalog::default(),
            profiles: BTreeMap::new(),
            defaults_only: true,
        }
    }
}

impl CostCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls payroll rates and employee financial profiles from the store,
    /// degrading to defaults when either is unavailable.
    pub fn from_store(store: &dyn MetricsStore) -> Self {
        let mut calculator = Self::default();
        match store.payroll_rates() {
            Ok(rates) => {
                calculator.payroll = rates;
                calculator.defaults_only = false;
            }
            Err(e) => debug!("payroll rates unavailable, using defaults: {e}"),
        }
        if let Ok(profiles) = store.employee_profiles(None) {
            calculator.defaults_only &= profiles.is_empty();
            calculator.profiles = profiles.into_iter().map(|e| (e.id.clone(), e)).collect();
        }
        calculator
    }

    pub fn with_payroll(mut self, payroll: PayrollRates) -> Self {
        self.payroll = payroll;
        self.defaults_only = false;
        self
    }

    pub fn with_params(mut self, params: CostParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_sites(mut self, sites: SiteCatalog) -> Self {
        self.sites = sites;
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<Employee>) -> Self {
        self.defaults_only &= profiles.is_empty();
        self.profiles = profiles.into_iter().map(|e| (e.id.clone(), e)).collect();
        self
    }

    pub fn params(&self) -> &CostParams {
        &self.params
    }

    pub fn sites(&self) -> &SiteCatalog {
        &self.sites
    }

    /// Computes the full weekly financial impact of a variant.
    pub fn calculate(&self, variant: &ScheduleVariant) -> FinancialImpact {
        let started = Instant::now();

        if variant.blocks.is_empty() {
            return FinancialImpact::zero(self.quality());
        }

        let mut by_employee: BTreeMap<&Id, Vec<&ShiftBlock>> = BTreeMap::new();
        for block in &variant.blocks {
            by_employee.entry(&block.employee_id).or_default().push(block);
        }

        let per_employee: Vec<EmployeeCost> = by_employee
            .into_iter()
            .map(|(id, blocks)| self.employee_cost(id, &blocks))
            .collect();

        let mut by_component: BTreeMap<CostComponent, f64> =
            CostComponent::ALL.iter().map(|&c| (c, 0.0)).collect();
        for cost in &per_employee {
            for (&component, &amount) in &cost.breakdown {
                *by_component.entry(component).or_default() += amount;
            }
        }
        let total: f64 = per_employee.iter().map(|c| c.total).sum();

        let savings = impact::savings_opportunities(&per_employee, &by_component, total);
        let efficiency = efficiency_indicators(&per_employee, &by_component, total);
        let cost_variation_pct = coefficient_of_variation(&per_employee);

        FinancialImpact {
            total_weekly_cost: total,
            by_component,
            per_employee,
            cost_variation_pct,
            efficiency,
            savings_opportunities: savings,
            quality: self.quality(),
            recommendation: None,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Assignment mode: solve the staffing model and convert the plan into a
    /// financial impact. Infeasible models return the documented marker with
    /// a remediation hint; no partial assignment is committed.
    pub fn calculate_assignment(&self, problem: &AssignmentProblem) -> FinancialImpact {
        let started = Instant::now();
        match assignment::solve(problem, &self.params, &self.sites) {
            Ok(plan) => {
                let mut impact = plan.into_impact();
                impact.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
                impact
            }
            Err(reason) => {
                debug!("assignment model infeasible: {reason}");
                let mut impact = FinancialImpact::infeasible(format!(
                    "Assignment infeasible: {reason}. Relax the budget cap, add agents, or lower coverage requirements."
                ));
                impact.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
                impact
            }
        }
    }

    fn quality(&self) -> CostQuality {
        if self.defaults_only {
            CostQuality::Estimated
        } else {
            CostQuality::Exact
        }
    }

    /// Hourly rate for one employee: salary-band midpoint over annual hours
    /// when a profile exists, payroll base otherwise; the employment-rate
    /// multiplier applies either way.
    fn hourly_rate(&self, employee: Option<&Employee>) -> f64 {
        match employee {
            Some(e) => {
                let base = match e.salary_band {
                    Some((lo, hi)) => (lo + hi) / 2.0 / ANNUAL_HOURS,
                    None => self.payroll.base_hourly,
                };
                base * e.work_rate
            }
            None => self.payroll.base_hourly,
        }
    }

    fn employee_cost(&self, employee_id: &Id, blocks: &[&ShiftBlock]) -> EmployeeCost {
        let employee = self.profiles.get(employee_id);
        let rate = self.hourly_rate(employee);

        let weekly_hours: f64 = blocks.iter().map(|b| b.weekly_hours()).sum();
        let regular_hours = weekly_hours.min(40.0);
        let overtime_hours = (weekly_hours - 40.0).max(0.0);

        let weekend_hours: f64 = blocks
            .iter()
            .map(|b| {
                if b.is_weekend() {
                    b.daily_hours() * f64::from(b.days_per_week.min(2))
                } else {
                    // a 6/7-day template spills into the weekend
                    b.daily_hours() * f64::from(b.days_per_week.saturating_sub(5))
                }
            })
            .sum();
        let night_hours: f64 = blocks
            .iter()
            .map(|b| f64::from(b.night_minutes()) / 60.0 * f64::from(b.days_per_week))
            .sum();

        let base = regular_hours * rate;
        let overtime = overtime_hours * rate * self.payroll.overtime_multiplier;
        let weekend_premium = weekend_hours * self.payroll.weekend_premium_hourly;
        let night_premium = night_hours * self.payroll.night_premium_hourly;
        let tier = employee.map(|e| e.skill_tier).unwrap_or_default();
        let skill_premium = (regular_hours + overtime_hours) * tier.hourly_premium();

        let gross = base + overtime + weekend_premium + night_premium + skill_premium;
        let benefits = gross * self.payroll.benefits_rate;

        let (travel, accommodation, coordination) = self.mobile_costs(employee, blocks);

        let mut breakdown: BTreeMap<CostComponent, f64> = BTreeMap::new();
        breakdown.insert(CostComponent::Base, base);
        breakdown.insert(CostComponent::Overtime, overtime);
        breakdown.insert(CostComponent::WeekendPremium, weekend_premium);
        breakdown.insert(CostComponent::NightPremium, night_premium);
        breakdown.insert(CostComponent::SkillPremium, skill_premium);
        breakdown.insert(CostComponent::Benefits, benefits);
        breakdown.insert(CostComponent::Travel, travel);
        breakdown.insert(CostComponent::Accommodation, accommodation);
        breakdown.insert(CostComponent::Coordination, coordination);

        let total: f64 = breakdown.values().sum();
        let productive = regular_hours + overtime_hours;
        let efficiency = if productive > 0.0 { total / productive } else { 0.0 };

        EmployeeCost {
            employee_id: employee_id.clone(),
            regular_hours,
            overtime_hours,
            breakdown,
            total,
            efficiency,
        }
    }

    /// Travel, accommodation, and coordination for cross-site assignments.
    fn mobile_costs(&self, employee: Option<&Employee>, blocks: &[&ShiftBlock]) -> (f64, f64, f64) {
        let Some(employee) = employee else {
            return (0.0, 0.0, 0.0);
        };

        let mut travel = 0.0;
        let mut accommodation = 0.0;
        let mut coordination = 0.0;
        let mut seen_sites: Vec<&str> = Vec::new();

        for block in blocks {
            let Some(site) = block.assigned_site.as_deref() else {
                continue;
            };
            if site == employee.base_site || seen_sites.contains(&site) {
                continue;
            }
            seen_sites.push(site);

            let km = self.sites.distance_km(&employee.base_site, site);
            travel += km * self.params.travel_rate_per_km;
            coordination += self.params.coordination_fee;
            if km > self.params.overnight_distance_km {
                let nights: f64 = blocks
                    .iter()
                    .filter(|b| b.assigned_site.as_deref() == Some(site))
                    .map(|b| f64::from(b.days_per_week))
                    .sum();
                accommodation += nights * self.params.accommodation_per_night;
            }
        }
        (travel, accommodation, coordination)
    }
}

fn efficiency_indicators(
    per_employee: &[EmployeeCost],
    by_component: &BTreeMap<CostComponent, f64>,
    total: f64,
) -> EfficiencyIndicators {
    if per_employee.is_empty() || total <= 0.0 {
        return EfficiencyIndicators::default();
    }
    let total_hours: f64 = per_employee
        .iter()
        .map(|c| c.regular_hours + c.overtime_hours)
        .sum();
    let overtime = by_component.get(&CostComponent::Overtime).copied().unwrap_or(0.0);
    let premiums = by_component
        .get(&CostComponent::WeekendPremium)
        .copied()
        .unwrap_or(0.0)
        + by_component
            .get(&CostComponent::NightPremium)
            .copied()
            .unwrap_or(0.0)
        + by_component
            .get(&CostComponent::SkillPremium)
            .copied()
            .unwrap_or(0.0);

    let mean_efficiency = per_employee.iter().map(|c| c.efficiency).sum::<f64>()
        / per_employee.len() as f64;
    let utilization = if mean_efficiency > 0.0 {
        (50.0 / mean_efficiency * 100.0).min(100.0)
    } else {
        0.0
    };

    EfficiencyIndicators {
        cost_per_hour: if total_hours > 0.0 { total / total_hours } else { 0.0 },
        average_employee_cost: total / per_employee.len() as f64,
        overtime_pct: overtime / total * 100.0,
        premium_pct: premiums / total * 100.0,
        utilization_efficiency: utilization,
    }
}

/// Coefficient of variation of per-employee totals, in percent.
fn coefficient_of_variation(per_employee: &[EmployeeCost]) -> f64 {
    if per_employee.len() < 2 {
        return 0.0;
    }
    let n = per_employee.len() as f64;
    let mean = per_employee.iter().map(|c| c.total).sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = per_employee
        .iter()
        .map(|c| (c.total - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PatternType, SkillTier};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap() // Monday
    }

    fn variant(blocks: Vec<ShiftBlock>) -> ScheduleVariant {
        ScheduleVariant::new("VAR_000", PatternType::Traditional, blocks)
    }

    // ── component formulas ────────────────────────────────────────────

    #[test]
    fn base_cost_for_a_standard_week() {
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16),
        ]));
        // 40h x 25/h = 1000, benefits 35% on gross
        assert!((impact.component_total(CostComponent::Base) - 1000.0).abs() < 1e-9);
        assert!((impact.component_total(CostComponent::Benefits) - 350.0).abs() < 1e-9);
        assert!((impact.total_weekly_cost - 1350.0).abs() < 1e-9);
    }

    #[test]
    fn overtime_pays_time_and_a_half() {
        // 10h x 5d = 50h: 40 regular + 10 overtime
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 18),
        ]));
        let overtime = impact.component_total(CostComponent::Overtime);
        assert!((overtime - 10.0 * 25.0 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn weekend_blocks_earn_the_premium() {
        let sat = NaiveDate::from_ymd_opt(2024, 7, 13).unwrap();
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::from_hours("E1", sat, 8, 16).with_days_per_week(2),
        ]));
        // 8h x 2 weekend days x 5/h premium
        assert!((impact.component_total(CostComponent::WeekendPremium) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn night_window_earns_the_differential() {
        // 22:00-06:00 wraps midnight: all 8h in the night window, 5 days
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::new("E1", date(), 1320, 1800),
        ]));
        assert!((impact.component_total(CostComponent::NightPremium) - 8.0 * 5.0 * 3.0).abs() < 1e-9);
    }

    #[test]
    fn skill_tier_premium_uses_profiles() {
        let calculator = CostCalculator::new()
            .with_profiles(vec![Employee::new("E1").with_skill_tier(SkillTier::Expert)]);
        let impact = calculator.calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16),
        ]));
        // 40h x 5/h expert premium
        assert!((impact.component_total(CostComponent::SkillPremium) - 200.0).abs() < 1e-9);
        assert_eq!(impact.quality, CostQuality::Exact);
    }

    #[test]
    fn salary_band_overrides_base_rate() {
        // midpoint 104k / 2080h = 50/h
        let calculator = CostCalculator::new()
            .with_profiles(vec![Employee::new("E1").with_salary_band(83_200.0, 124_800.0)]);
        let impact = calculator.calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16),
        ]));
        assert!((impact.component_total(CostComponent::Base) - 2000.0).abs() < 1e-9);
    }

    // ── mobile workforce components ───────────────────────────────────

    #[test]
    fn cross_site_assignment_costs_travel_and_coordination() {
        let calculator = CostCalculator::new()
            .with_profiles(vec![Employee::new("E1").with_base_site("hq")])
            .with_sites(SiteCatalog::new().with_distance("hq", "north", 120.0));
        let impact = calculator.calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16).with_site("north"),
        ]));
        assert!((impact.component_total(CostComponent::Travel) - 60.0).abs() < 1e-9);
        assert!((impact.component_total(CostComponent::Coordination) - 15.0).abs() < 1e-9);
        // 120 km is a commute, not an overnight stay
        assert_eq!(impact.component_total(CostComponent::Accommodation), 0.0);
    }

    #[test]
    fn distant_sites_add_accommodation_nights() {
        let calculator = CostCalculator::new()
            .with_profiles(vec![Employee::new("E1").with_base_site("hq")])
            .with_sites(SiteCatalog::new().with_distance("hq", "remote", 350.0));
        let impact = calculator.calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16).with_site("remote"),
        ]));
        // 5 nights x 80
        assert!((impact.component_total(CostComponent::Accommodation) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn home_site_work_has_no_mobile_costs() {
        let calculator = CostCalculator::new()
            .with_profiles(vec![Employee::new("E1").with_base_site("hq")]);
        let impact = calculator.calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16).with_site("hq"),
        ]));
        assert_eq!(impact.component_total(CostComponent::Travel), 0.0);
        assert_eq!(impact.component_total(CostComponent::Coordination), 0.0);
    }

    // ── aggregates and edge cases ─────────────────────────────────────

    #[test]
    fn empty_variant_returns_zero_filled_impact() {
        let impact = CostCalculator::new().calculate(&variant(vec![]));
        assert_eq!(impact.total_weekly_cost, 0.0);
        assert!(impact.per_employee.is_empty());
        assert_eq!(impact.cost_variation_pct, 0.0);
    }

    #[test]
    fn variation_reflects_cost_spread() {
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16),
            ShiftBlock::from_hours("E2", date(), 8, 18), // overtime-heavy
        ]));
        assert!(impact.cost_variation_pct > 0.0);
    }

    #[test]
    fn defaults_only_marks_estimated() {
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 16),
        ]));
        assert_eq!(impact.quality, CostQuality::Estimated);
    }

    #[test]
    fn overtime_heavy_week_surfaces_savings() {
        // 12h x 5d = 60h: a third of hours are overtime
        let impact = CostCalculator::new().calculate(&variant(vec![
            ShiftBlock::from_hours("E1", date(), 8, 20),
        ]));
        assert!(impact
            .savings_opportunities
            .iter()
            .any(|s| s.contains("overtime")));
    }
}
