//! In-memory store implementations for tests and embedding.

use std::collections::{BTreeMap, BTreeSet};

use super::rows::{
    BusinessRuleRow, CoverageSnapshot, OptimizationOutcome, PayrollRates, RuleRow, ShiftPreference,
    WorkRuleRow,
};
use super::{DateRange, MetricsStore, ScheduleLoader, StoreError};
use crate::model::{Employee, ShiftBlock, Slot};
use crate::Id;

/// A [`MetricsStore`] backed by plain collections.
///
/// `set_available(false)` makes every operation return
/// [`StoreError::Unavailable`], which exercises the fallback paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetricsStore {
    pub constraint_rules: Vec<RuleRow>,
    pub work_rules: Vec<WorkRuleRow>,
    pub business_rules: Vec<BusinessRuleRow>,
    pub schedule_constraints: Vec<RuleRow>,
    pub employees: Vec<Employee>,
    pub preferences: Vec<ShiftPreference>,
    pub payroll: Option<PayrollRates>,
    pub cost_center_budgets: BTreeMap<Id, f64>,
    pub coverage_snapshot: Option<CoverageSnapshot>,
    pub history: Vec<OptimizationOutcome>,
    pub kpi_targets: BTreeMap<String, f64>,
    unavailable: bool,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// An always-unavailable store; every consumer falls back.
    pub fn offline() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    pub fn with_employees(mut self, employees: Vec<Employee>) -> Self {
        self.employees = employees;
        self
    }

    pub fn with_constraint_rules(mut self, rules: Vec<RuleRow>) -> Self {
        self.constraint_rules = rules;
        self
    }

    pub fn with_work_rules(mut self, rules: Vec<WorkRuleRow>) -> Self {
        self.work_rules = rules;
        self
    }

    pub fn with_business_rules(mut self, rules: Vec<BusinessRuleRow>) -> Self {
        self.business_rules = rules;
        self
    }

    pub fn with_preferences(mut self, preferences: Vec<ShiftPreference>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_payroll(mut self, rates: PayrollRates) -> Self {
        self.payroll = Some(rates);
        self
    }

    pub fn with_history(mut self, history: Vec<OptimizationOutcome>) -> Self {
        self.history = history;
        self
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        } else {
            Ok(())
        }
    }
}

impl MetricsStore for InMemoryMetricsStore {
    fn list_active_constraint_rules(&self) -> Result<Vec<RuleRow>, StoreError> {
        self.check()?;
        Ok(self.constraint_rules.clone())
    }

    fn list_work_rules(&self) -> Result<Vec<WorkRuleRow>, StoreError> {
        self.check()?;
        Ok(self.work_rules.clone())
    }

    fn list_business_rules(&self) -> Result<Vec<BusinessRuleRow>, StoreError> {
        self.check()?;
        Ok(self.business_rules.clone())
    }

    fn list_schedule_constraints(&self) -> Result<Vec<RuleRow>, StoreError> {
        self.check()?;
        Ok(self.schedule_constraints.clone())
    }

    fn employee_profiles(&self, ids: Option<&[Id]>) -> Result<Vec<Employee>, StoreError> {
        self.check()?;
        Ok(match ids {
            None => self.employees.clone(),
            Some(ids) => self
                .employees
                .iter()
                .filter(|e| ids.contains(&e.id))
                .cloned()
                .collect(),
        })
    }

    fn employee_skills(&self) -> Result<BTreeMap<Id, BTreeSet<Id>>, StoreError> {
        self.check()?;
        Ok(self
            .employees
            .iter()
            .map(|e| (e.id.clone(), e.skills.clone()))
            .collect())
    }

    fn employee_preferences(&self) -> Result<Vec<ShiftPreference>, StoreError> {
        self.check()?;
        Ok(self.preferences.clone())
    }

    fn payroll_rates(&self) -> Result<PayrollRates, StoreError> {
        self.check()?;
        Ok(self.payroll.unwrap_or_default())
    }

    fn cost_center_budget(&self, id: &str) -> Result<Option<f64>, StoreError> {
        self.check()?;
        Ok(self.cost_center_budgets.get(id).copied())
    }

    fn latest_coverage_analysis(&self) -> Result<Option<CoverageSnapshot>, StoreError> {
        self.check()?;
        Ok(self.coverage_snapshot.clone())
    }

    fn optimization_history(&self, limit: usize) -> Result<Vec<OptimizationOutcome>, StoreError> {
        self.check()?;
        Ok(self.history.iter().take(limit).cloned().collect())
    }

    fn kpi_target(&self, code: &str) -> Result<Option<f64>, StoreError> {
        self.check()?;
        Ok(self.kpi_targets.get(code).copied())
    }
}

/// A [`ScheduleLoader`] over fixed collections.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleLoader {
    pub schedule: Vec<ShiftBlock>,
    pub forecast: BTreeMap<Slot, u32>,
    fail: bool,
}

impl InMemoryScheduleLoader {
    pub fn new(schedule: Vec<ShiftBlock>, forecast: BTreeMap<Slot, u32>) -> Self {
        Self {
            schedule,
            forecast,
            fail: false,
        }
    }

    /// A loader that always fails, for data-quality degradation tests.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl ScheduleLoader for InMemoryScheduleLoader {
    fn load_schedule(
        &self,
        range: &DateRange,
        _service_id: &str,
    ) -> Result<Vec<ShiftBlock>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("schedule source offline".into()));
        }
        Ok(self
            .schedule
            .iter()
            .filter(|b| range.contains(b.date))
            .cloned()
            .collect())
    }

    fn load_forecast(
        &self,
        _range: &DateRange,
        _service_id: &str,
    ) -> Result<BTreeMap<Slot, u32>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("forecast source offline".into()));
        }
        Ok(self.forecast.clone())
    }
}
