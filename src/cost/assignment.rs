//! Optional assignment mode: a linear staffing model over interchangeable
//! agents, sites, and intervals.
//!
//! Interval-structured coverage matrices are integral, so relaxing the
//! binary assignment variables to `[0, 1]` still lands on the mixed-integer
//! optimum for these instances; infeasibility is detected by the solver and
//! surfaced as the documented `Infeasible` marker, never as a partial plan.

use std::collections::{BTreeMap, BTreeSet};

use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use serde::{Deserialize, Serialize};

use super::impact::{CostComponent, CostQuality, EmployeeCost, FinancialImpact};
use super::{CostParams, SiteCatalog};
use crate::model::Slot;
use crate::Id;

/// Share of required headcount that must hold the required skill.
const SKILL_COVERAGE_SHARE: f64 = 0.8;

/// One interchangeable agent in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: Id,
    pub hourly_cost: f64,
    pub skills: BTreeSet<Id>,
    pub base_site: Id,
    pub max_hours_per_day: f64,
    pub min_hours_per_day: f64,
    pub cost_center_id: Option<Id>,
}

impl AgentProfile {
    pub fn new(id: impl Into<Id>, hourly_cost: f64) -> Self {
        Self {
            id: id.into(),
            hourly_cost,
            skills: BTreeSet::new(),
            base_site: "main".into(),
            max_hours_per_day: 10.0,
            min_hours_per_day: 0.0,
            cost_center_id: None,
        }
    }

    pub fn with_skill(mut self, skill: impl Into<Id>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn with_base_site(mut self, site: impl Into<Id>) -> Self {
        self.base_site = site.into();
        self
    }

    pub fn with_daily_hours(mut self, min: f64, max: f64) -> Self {
        self.min_hours_per_day = min;
        self.max_hours_per_day = max;
        self
    }

    pub fn with_cost_center(mut self, id: impl Into<Id>) -> Self {
        self.cost_center_id = Some(id.into());
        self
    }
}

/// Interval demand for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDemand {
    pub site: Id,
    pub demand: BTreeMap<Slot, u32>,
    pub required_skills: BTreeSet<Id>,
}

impl SiteDemand {
    pub fn new(site: impl Into<Id>, demand: BTreeMap<Slot, u32>) -> Self {
        Self {
            site: site.into(),
            demand,
            required_skills: BTreeSet::new(),
        }
    }

    pub fn with_required_skill(mut self, skill: impl Into<Id>) -> Self {
        self.required_skills.insert(skill.into());
        self
    }
}

/// The staffing model handed to the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentProblem {
    pub agents: Vec<AgentProfile>,
    pub sites: Vec<SiteDemand>,
    /// Cost-center budgets; spend is capped at the configured share.
    pub budgets: BTreeMap<Id, f64>,
}

/// One agent-to-interval placement in the solved plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: Id,
    pub site: Id,
    pub slot: Slot,
}

/// Feasible solution of the assignment model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub assignments: Vec<Assignment>,
    pub staffing_cost: f64,
    pub travel_cost: f64,
    pub accommodation_cost: f64,
    pub total_cost: f64,
    /// Staffing spend per agent, for the per-employee breakdown.
    pub cost_by_agent: BTreeMap<Id, f64>,
}

impl AssignmentPlan {
    /// Converts the plan into the common financial-impact shape.
    pub fn into_impact(self) -> FinancialImpact {
        let mut impact = FinancialImpact::zero(CostQuality::Exact);
        impact.total_weekly_cost = self.total_cost;
        impact
            .by_component
            .insert(CostComponent::Base, self.staffing_cost);
        impact
            .by_component
            .insert(CostComponent::Travel, self.travel_cost);
        impact
            .by_component
            .insert(CostComponent::Accommodation, self.accommodation_cost);
        impact.per_employee = self
            .cost_by_agent
            .iter()
            .map(|(id, &cost)| EmployeeCost {
                employee_id: id.clone(),
                regular_hours: 0.0,
                overtime_hours: 0.0,
                breakdown: [(CostComponent::Base, cost)].into_iter().collect(),
                total: cost,
                efficiency: 0.0,
            })
            .collect();
        impact
    }
}

/// Solves the model. `Err` carries the infeasibility reason.
pub(crate) fn solve(
    problem: &AssignmentProblem,
    params: &CostParams,
    sites: &SiteCatalog,
) -> Result<AssignmentPlan, String> {
    if problem.sites.iter().all(|s| s.demand.is_empty()) {
        return Ok(AssignmentPlan {
            assignments: Vec::new(),
            staffing_cost: 0.0,
            travel_cost: 0.0,
            accommodation_cost: 0.0,
            total_cost: 0.0,
            cost_by_agent: BTreeMap::new(),
        });
    }

    let mut vars = variables!();

    // x[(site, agent, slot)]: agent works this interval at this site.
    let mut x: BTreeMap<(usize, usize, Slot), Variable> = BTreeMap::new();
    // y[(agent, site)]: agent travels to a non-home site.
    let mut y: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
    // z[(agent, site)]: overnight accommodation at a distant site.
    let mut z: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
    // u[agent]: agent is used at all (drives the min-hours floor).
    let mut u: Vec<Variable> = Vec::with_capacity(problem.agents.len());

    for (si, site) in problem.sites.iter().enumerate() {
        for (ai, agent) in problem.agents.iter().enumerate() {
            for &slot in site.demand.keys() {
                x.insert((si, ai, slot), vars.add(variable().min(0.0).max(1.0)));
            }
            if agent.base_site != site.site {
                y.insert((ai, si), vars.add(variable().min(0.0).max(1.0)));
                let km = sites.distance_km(&agent.base_site, &site.site);
                if km > params.overnight_distance_km {
                    z.insert((ai, si), vars.add(variable().min(0.0).max(1.0)));
                }
            }
        }
    }
    for _ in &problem.agents {
        u.push(vars.add(variable().min(0.0).max(1.0)));
    }

    // Objective: staffing + travel + accommodation.
    let mut objective = Expression::default();
    for (&(_, ai, slot), &var) in &x {
        objective += problem.agents[ai].hourly_cost * slot.width_hours() * var;
    }
    for (&(ai, si), &var) in &y {
        let km = sites.distance_km(&problem.agents[ai].base_site, &problem.sites[si].site);
        objective += km * params.travel_rate_per_km * var;
    }
    for (_, &var) in &z {
        objective += params.accommodation_per_night * var;
    }

    let mut model = vars.minimise(objective).using(default_solver);

    // Coverage: every interval at every site is staffed to demand.
    for (si, site) in problem.sites.iter().enumerate() {
        for (&slot, &required) in &site.demand {
            let mut staffed = Expression::default();
            for ai in 0..problem.agents.len() {
                staffed += x[&(si, ai, slot)];
            }
            model = model.with(constraint!(staffed >= f64::from(required)));

            // Skill coverage: most of the demand holds each required skill.
            for skill in &site.required_skills {
                let mut skilled = Expression::default();
                for (ai, agent) in problem.agents.iter().enumerate() {
                    if agent.skills.contains(skill) {
                        skilled += x[&(si, ai, slot)];
                    }
                }
                model = model.with(constraint!(
                    skilled >= SKILL_COVERAGE_SHARE * f64::from(required)
                ));
            }
        }
    }

    // Per-agent daily hour window and usage linking.
    for (ai, agent) in problem.agents.iter().enumerate() {
        let mut hours = Expression::default();
        for (si, site) in problem.sites.iter().enumerate() {
            for &slot in site.demand.keys() {
                hours += slot.width_hours() * x[&(si, ai, slot)];
                model = model.with(constraint!(x[&(si, ai, slot)] <= u[ai]));
            }
        }
        model = model.with(constraint!(hours.clone() <= agent.max_hours_per_day));
        if agent.min_hours_per_day > 0.0 {
            model = model.with(constraint!(hours >= agent.min_hours_per_day * u[ai]));
        }
    }

    // Travel linking and accommodation coupling.
    for (&(ai, si), &travel_var) in &y {
        for &slot in problem.sites[si].demand.keys() {
            model = model.with(constraint!(x[&(si, ai, slot)] <= travel_var));
        }
        if let Some(&acc_var) = z.get(&(ai, si)) {
            model = model.with(constraint!(acc_var >= travel_var));
        }
    }

    // Cost-center budget caps.
    for (center, &budget) in &problem.budgets {
        let mut spend = Expression::default();
        let mut any = false;
        for (ai, agent) in problem.agents.iter().enumerate() {
            if agent.cost_center_id.as_deref() != Some(center.as_str()) {
                continue;
            }
            any = true;
            for (si, site) in problem.sites.iter().enumerate() {
                for &slot in site.demand.keys() {
                    spend += agent.hourly_cost * slot.width_hours() * x[&(si, ai, slot)];
                }
                if let Some(&travel_var) = y.get(&(ai, si)) {
                    let km = sites.distance_km(&agent.base_site, &site.site);
                    spend += km * params.travel_rate_per_km * travel_var;
                }
                if let Some(&acc_var) = z.get(&(ai, si)) {
                    spend += params.accommodation_per_night * acc_var;
                }
            }
        }
        if any {
            model = model.with(constraint!(spend <= params.budget_cap_factor * budget));
        }
    }

    let solution = model.solve().map_err(|e| match e {
        ResolutionError::Infeasible => {
            "coverage, hours, and budget constraints cannot all hold".to_string()
        }
        ResolutionError::Unbounded => "model is unbounded".to_string(),
        other => format!("solver failure: {other}"),
    })?;

    // Extract committed placements. Coverage/cap rows form a transportation
    // structure, so simplex vertices are integral there; fractional skill
    // splits fall below the threshold and stay uncommitted.
    let mut assignments = Vec::new();
    let mut staffing_cost = 0.0;
    let mut cost_by_agent: BTreeMap<Id, f64> = BTreeMap::new();
    for (&(si, ai, slot), &var) in &x {
        if solution.value(var) > 0.5 {
            let agent = &problem.agents[ai];
            let cost = agent.hourly_cost * slot.width_hours();
            staffing_cost += cost;
            *cost_by_agent.entry(agent.id.clone()).or_default() += cost;
            assignments.push(Assignment {
                agent_id: agent.id.clone(),
                site: problem.sites[si].site.clone(),
                slot,
            });
        }
    }
    let mut travel_cost = 0.0;
    for (&(ai, si), &var) in &y {
        if solution.value(var) > 0.5 {
            let km = sites.distance_km(&problem.agents[ai].base_site, &problem.sites[si].site);
            travel_cost += km * params.travel_rate_per_km;
        }
    }
    let mut accommodation_cost = 0.0;
    for (_, &var) in &z {
        if solution.value(var) > 0.5 {
            accommodation_cost += params.accommodation_per_night;
        }
    }

    Ok(AssignmentPlan {
        assignments,
        total_cost: staffing_cost + travel_cost + accommodation_cost,
        staffing_cost,
        travel_cost,
        accommodation_cost,
        cost_by_agent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(hours: &[(u8, u32)]) -> BTreeMap<Slot, u32> {
        hours.iter().map(|&(h, n)| (Slot::hourly(h), n)).collect()
    }

    fn solve_default(problem: &AssignmentProblem) -> Result<AssignmentPlan, String> {
        solve(problem, &CostParams::default(), &SiteCatalog::default())
    }

    #[test]
    fn covers_demand_with_the_cheapest_agents() {
        let problem = AssignmentProblem {
            agents: vec![
                AgentProfile::new("cheap", 20.0),
                AgentProfile::new("pricey", 40.0),
            ],
            sites: vec![SiteDemand::new("main", demand(&[(9, 1), (10, 1)]))],
            budgets: BTreeMap::new(),
        };
        let plan = solve_default(&problem).unwrap();
        assert_eq!(plan.assignments.len(), 2);
        assert!(plan.assignments.iter().all(|a| a.agent_id == "cheap"));
        assert!((plan.total_cost - 40.0).abs() < 1e-6);
    }

    #[test]
    fn infeasible_when_demand_exceeds_the_pool() {
        let problem = AssignmentProblem {
            agents: vec![AgentProfile::new("only", 20.0)],
            sites: vec![SiteDemand::new("main", demand(&[(9, 3)]))],
            budgets: BTreeMap::new(),
        };
        assert!(solve_default(&problem).is_err());
    }

    #[test]
    fn skill_coverage_forces_qualified_staffing() {
        let problem = AssignmentProblem {
            agents: vec![
                AgentProfile::new("generalist", 10.0),
                AgentProfile::new("specialist", 30.0).with_skill("voice"),
            ],
            sites: vec![
                SiteDemand::new("main", demand(&[(9, 1)])).with_required_skill("voice"),
            ],
            budgets: BTreeMap::new(),
        };
        let plan = solve_default(&problem).unwrap();
        assert!(plan
            .assignments
            .iter()
            .any(|a| a.agent_id == "specialist"));
    }

    #[test]
    fn daily_hour_cap_spreads_the_load() {
        let problem = AssignmentProblem {
            agents: vec![
                AgentProfile::new("a", 20.0).with_daily_hours(0.0, 2.0),
                AgentProfile::new("b", 20.0).with_daily_hours(0.0, 2.0),
            ],
            sites: vec![SiteDemand::new("main", demand(&[(9, 1), (10, 1), (11, 1)]))],
            budgets: BTreeMap::new(),
        };
        let plan = solve_default(&problem).unwrap();
        let a_hours = plan.assignments.iter().filter(|a| a.agent_id == "a").count();
        let b_hours = plan.assignments.iter().filter(|a| a.agent_id == "b").count();
        assert_eq!(a_hours + b_hours, 3);
        assert!(a_hours <= 2 && b_hours <= 2);
    }

    #[test]
    fn budget_cap_makes_expensive_coverage_infeasible() {
        let problem = AssignmentProblem {
            agents: vec![AgentProfile::new("a", 50.0).with_cost_center("cc1")],
            sites: vec![SiteDemand::new("main", demand(&[(9, 1), (10, 1)]))],
            // 2h x 50 = 100 spend, but only 80% x 100 = 80 allowed
            budgets: [("cc1".to_string(), 100.0)].into_iter().collect(),
        };
        assert!(solve_default(&problem).is_err());
    }

    #[test]
    fn remote_site_incurs_travel() {
        let catalog = SiteCatalog::new().with_distance("hq", "north", 100.0);
        let problem = AssignmentProblem {
            agents: vec![AgentProfile::new("a", 20.0).with_base_site("hq")],
            sites: vec![SiteDemand::new("north", demand(&[(9, 1)]))],
            budgets: BTreeMap::new(),
        };
        let plan = solve(&problem, &CostParams::default(), &catalog).unwrap();
        assert!((plan.travel_cost - 50.0).abs() < 1e-6);
    }

    #[test]
    fn empty_demand_is_trivially_feasible() {
        let problem = AssignmentProblem::default();
        let plan = solve_default(&problem).unwrap();
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.total_cost, 0.0);
    }

    #[test]
    fn infeasible_impact_carries_the_marker() {
        let problem = AssignmentProblem {
            agents: vec![AgentProfile::new("only", 20.0)],
            sites: vec![SiteDemand::new("main", demand(&[(9, 5)]))],
            budgets: BTreeMap::new(),
        };
        let impact = crate::cost::CostCalculator::new().calculate_assignment(&problem);
        assert_eq!(impact.quality, CostQuality::Infeasible);
        assert!(impact.recommendation.is_some());
        assert_eq!(impact.total_weekly_cost, 0.0);
    }
}
