//! External capabilities: durable metrics storage and schedule/forecast
//! loading. All persistence sits behind these traits; stage logic stays pure.

mod memory;
mod rows;

pub use memory::{InMemoryMetricsStore, InMemoryScheduleLoader};
pub use rows::{
    BusinessRuleRow, CoverageSnapshot, CoverageWindow, OptimizationOutcome, PayrollRates, RuleRow,
    ShiftPreference, WorkRuleRow,
};

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Employee, ShiftBlock, Slot};
use crate::Id;

/// Store faults. Consumers never propagate these: every stage has a
/// documented fallback path and tags its report accordingly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out after {0} ms")]
    Timeout(u64),
}

/// Inclusive calendar date range for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Durable metrics and rules storage consumed by the pipeline.
///
/// # Contract
///
/// Operations are idempotent and safe to cache for the lifetime of one run.
/// An `Err` means "unavailable" and triggers the consuming stage's fallback;
/// it never aborts a run.
pub trait MetricsStore: Send + Sync {
    fn list_active_constraint_rules(&self) -> Result<Vec<RuleRow>, StoreError>;

    fn list_work_rules(&self) -> Result<Vec<WorkRuleRow>, StoreError>;

    fn list_business_rules(&self) -> Result<Vec<BusinessRuleRow>, StoreError>;

    fn list_schedule_constraints(&self) -> Result<Vec<RuleRow>, StoreError>;

    /// Employee records, optionally narrowed to `ids`.
    fn employee_profiles(&self, ids: Option<&[Id]>) -> Result<Vec<Employee>, StoreError>;

    fn employee_skills(&self) -> Result<BTreeMap<Id, BTreeSet<Id>>, StoreError>;

    fn employee_preferences(&self) -> Result<Vec<ShiftPreference>, StoreError>;

    fn payroll_rates(&self) -> Result<PayrollRates, StoreError>;

    fn cost_center_budget(&self, id: &str) -> Result<Option<f64>, StoreError>;

    /// Most recent completed coverage analysis, if any.
    fn latest_coverage_analysis(&self) -> Result<Option<CoverageSnapshot>, StoreError>;

    /// Recent optimization outcomes, newest first, at most `limit`.
    fn optimization_history(&self, limit: usize) -> Result<Vec<OptimizationOutcome>, StoreError>;

    fn kpi_target(&self, code: &str) -> Result<Option<f64>, StoreError>;
}

/// Loads the current schedule and the staffing forecast for a run.
///
/// Failure is represented as empty collections by callers; the orchestrator
/// reflects it in the run's `data_quality` instead of failing.
pub trait ScheduleLoader: Send + Sync {
    fn load_schedule(&self, range: &DateRange, service_id: &str)
        -> Result<Vec<ShiftBlock>, StoreError>;

    fn load_forecast(
        &self,
        range: &DateRange,
        service_id: &str,
    ) -> Result<BTreeMap<Slot, u32>, StoreError>;
}
