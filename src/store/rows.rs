//! Row types returned by [`MetricsStore`](super::MetricsStore) operations.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validator::{RuleCategory, Severity};
use crate::Id;

/// Declarative constraint rule row.
///
/// `kind` + `params` are the rule's condition in declarative form; the
/// validator's loader compiles them into a typed predicate. Unknown kinds
/// survive as `Custom` predicates and are reported as unevaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: Id,
    pub category: RuleCategory,
    pub kind: String,
    pub params: BTreeMap<String, f64>,
    pub severity: Severity,
    pub cost_impact: f64,
    pub remedy_hint: String,
    /// Scope the rule to a single employee (contract checks); `None` means
    /// the rule applies to every employee in the variant.
    pub applies_to: Option<Id>,
}

impl RuleRow {
    pub fn new(
        id: impl Into<Id>,
        category: RuleCategory,
        kind: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            kind: kind.into(),
            params: BTreeMap::new(),
            severity,
            cost_impact: 0.0,
            remedy_hint: String::new(),
            applies_to: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_cost_impact(mut self, cost: f64) -> Self {
        self.cost_impact = cost;
        self
    }

    pub fn with_remedy(mut self, hint: impl Into<String>) -> Self {
        self.remedy_hint = hint.into();
        self
    }

    pub fn scoped_to(mut self, employee_id: impl Into<Id>) -> Self {
        self.applies_to = Some(employee_id.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }
}

/// Work-rules registry row: inter-shift rest and consecutive-day limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRuleRow {
    pub id: Id,
    pub name: String,
    pub min_hours_between_shifts: f64,
    pub max_consecutive_work_days: u32,
}

/// Minimum-coverage window demanded by a business rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageWindow {
    pub start_hour: u8,
    pub end_hour: u8,
    pub min_agents: u32,
}

/// Business-rules engine row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRuleRow {
    pub id: Id,
    pub name: String,
    /// Alert when weekly overtime reaches this many hours.
    pub overtime_alert_hours: Option<f64>,
    pub min_coverage: Option<CoverageWindow>,
}

/// Schedule-preferences registry row for one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftPreference {
    pub employee_id: Id,
    pub preferred_start_min: Option<u16>,
    pub preferred_end_min: Option<u16>,
    pub day_off_dates: BTreeSet<NaiveDate>,
}

impl ShiftPreference {
    pub fn new(employee_id: impl Into<Id>) -> Self {
        Self {
            employee_id: employee_id.into(),
            preferred_start_min: None,
            preferred_end_min: None,
            day_off_dates: BTreeSet::new(),
        }
    }

    pub fn with_window(mut self, start_min: u16, end_min: u16) -> Self {
        self.preferred_start_min = Some(start_min);
        self.preferred_end_min = Some(end_min);
        self
    }

    pub fn with_day_off(mut self, date: NaiveDate) -> Self {
        self.day_off_dates.insert(date);
        self
    }
}

/// Payroll rates used when no per-employee profile applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayrollRates {
    pub base_hourly: f64,
    pub overtime_multiplier: f64,
    /// Premium per weekend hour, on top of base.
    pub weekend_premium_hourly: f64,
    /// Premium per night hour (22:00-06:00), on top of base.
    pub night_premium_hourly: f64,
    /// Benefits load on gross wages.
    pub benefits_rate: f64,
}

impl Default for PayrollRates {
    fn default() -> Self {
        Self {
            base_hourly: 25.00,
            overtime_multiplier: 1.5,
            weekend_premium_hourly: 5.00,
            night_premium_hourly: 3.00,
            benefits_rate: 0.35,
        }
    }
}

/// Latest completed coverage analysis kept by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    pub coverage_pct: f64,
    pub peak_hours: Vec<u8>,
    pub total_gaps: u32,
}

/// One historical optimization run's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub algorithm: String,
    pub improvement_pct: f64,
    pub execution_time_ms: u64,
}
