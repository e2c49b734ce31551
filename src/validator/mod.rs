//! Constraint validation: labor law, contract, union, business, and
//! preference rules evaluated against schedule variants.

mod derived;
mod matrix;
mod rule;

pub use matrix::{ComplianceMatrix, RuleSource, ValidationSummary, Violation};
pub use rule::{
    compile_business_rule, compile_rule_row, compile_work_rule, fallback_rules, CompiledRule,
    ConstraintPredicate, RuleCategory, Severity,
};

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::model::{Employee, EmploymentType, ScheduleVariant};
use crate::store::{MetricsStore, ShiftPreference};
use crate::Id;

use derived::EmployeeDerived;

/// Rule-based compliance validator.
///
/// Rules and employee data are loaded once (normally at orchestrator entry)
/// and cached for the lifetime of the run; `validate` itself is pure.
///
/// # Fallback
///
/// When every rule source is unreachable the validator falls back to a
/// built-in minimal rule set and tags results with
/// [`RuleSource::Fallback`]. Store errors never propagate out of
/// `validate`; they surface in the matrix's `validation_summary`.
#[derive(Debug, Clone)]
pub struct ConstraintValidator {
    rules: Vec<CompiledRule>,
    employees: BTreeMap<Id, Employee>,
    preferences: BTreeMap<Id, ShiftPreference>,
    source: RuleSource,
    load_errors: Vec<String>,
}

impl ConstraintValidator {
    /// Loads and compiles all rule sources from the store.
    pub fn from_store(store: &dyn MetricsStore) -> Self {
        let mut rules = Vec::new();
        let mut load_errors = Vec::new();
        let mut any_source = false;

        match store.list_active_constraint_rules() {
            Ok(rows) => {
                any_source = true;
                rules.extend(rows.iter().map(compile_rule_row));
            }
            Err(e) => load_errors.push(format!("constraint rules: {e}")),
        }
        match store.list_work_rules() {
            Ok(rows) => {
                any_source = true;
                rules.extend(rows.iter().flat_map(compile_work_rule));
            }
            Err(e) => load_errors.push(format!("work rules: {e}")),
        }
        match store.list_business_rules() {
            Ok(rows) => {
                any_source = true;
                rules.extend(rows.iter().flat_map(compile_business_rule));
            }
            Err(e) => load_errors.push(format!("business rules: {e}")),
        }
        match store.list_schedule_constraints() {
            Ok(rows) => {
                any_source = true;
                rules.extend(rows.iter().map(compile_rule_row));
            }
            Err(e) => load_errors.push(format!("schedule constraints: {e}")),
        }

        let source = if any_source {
            RuleSource::Store
        } else {
            warn!("all rule sources unavailable, using built-in fallback rule set");
            rules = fallback_rules();
            RuleSource::Fallback
        };

        let employees = match store.employee_profiles(None) {
            Ok(list) => {
                let mut map: BTreeMap<Id, Employee> =
                    list.into_iter().map(|e| (e.id.clone(), e)).collect();
                if let Ok(skills) = store.employee_skills() {
                    for (id, skill_set) in skills {
                        if let Some(employee) = map.get_mut(&id) {
                            employee.skills.extend(skill_set);
                        }
                    }
                }
                map
            }
            Err(e) => {
                load_errors.push(format!("employee profiles: {e}"));
                BTreeMap::new()
            }
        };

        let preferences = match store.employee_preferences() {
            Ok(list) => list
                .into_iter()
                .map(|p| (p.employee_id.clone(), p))
                .collect(),
            Err(e) => {
                load_errors.push(format!("employee preferences: {e}"));
                BTreeMap::new()
            }
        };

        debug!(
            rules = rules.len(),
            employees = employees.len(),
            source = ?source,
            "constraint validator ready"
        );

        Self {
            rules,
            employees,
            preferences,
            source,
            load_errors,
        }
    }

    /// Builds a validator from already compiled rules; used by tests and by
    /// embedders that manage their own rule sources.
    pub fn with_rules(
        rules: Vec<CompiledRule>,
        employees: Vec<Employee>,
        preferences: Vec<ShiftPreference>,
    ) -> Self {
        Self {
            rules,
            employees: employees.into_iter().map(|e| (e.id.clone(), e)).collect(),
            preferences: preferences
                .into_iter()
                .map(|p| (p.employee_id.clone(), p))
                .collect(),
            source: RuleSource::Store,
            load_errors: Vec::new(),
        }
    }

    /// The built-in minimal rule set, with no employee data.
    pub fn fallback() -> Self {
        Self {
            rules: fallback_rules(),
            employees: BTreeMap::new(),
            preferences: BTreeMap::new(),
            source: RuleSource::Fallback,
            load_errors: Vec::new(),
        }
    }

    pub fn source(&self) -> RuleSource {
        self.source
    }

    /// Validates a variant, optionally scoped to a subset of employees.
    pub fn validate(
        &self,
        variant: &ScheduleVariant,
        employee_scope: Option<&[Id]>,
    ) -> ComplianceMatrix {
        let all_derived = derived::derive_all(variant);
        let scoped: BTreeMap<&Id, &EmployeeDerived> = all_derived
            .iter()
            .filter(|&(id, _)| match employee_scope {
                None => true,
                Some(scope) => scope.contains(id),
            })
            .collect();
        let histogram = variant.hour_coverage();

        let mut violations = Vec::new();
        let mut unevaluated = Vec::new();

        for rule in &self.rules {
            match &rule.predicate {
                ConstraintPredicate::MinCoverageWindow {
                    start_hour,
                    end_hour,
                    min_agents,
                } => {
                    for hour in *start_hour..*end_hour {
                        if histogram[usize::from(hour)] < *min_agents {
                            violations.push(Violation {
                                rule_id: rule.id.clone(),
                                category: rule.category,
                                severity: rule.severity,
                                description: format!(
                                    "Coverage below {min_agents} at {hour:02}:00"
                                ),
                                affected_employee: None,
                                affected_interval: Some(format!("{hour:02}:00")),
                                remedy_hint: remedy(rule, "Add coverage during business hours"),
                                cost_impact: cost(rule, 100.0),
                            });
                        }
                    }
                }
                ConstraintPredicate::Custom { expr } => {
                    debug!(rule = %rule.id, expr = %expr, "skipping custom rule condition");
                    unevaluated.push(rule.id.clone());
                }
                _ => {
                    for (&employee_id, derived) in &scoped {
                        if let Some(scope_id) = &rule.applies_to {
                            if scope_id != employee_id {
                                continue;
                            }
                        }
                        if let Some(v) = self.check_employee(rule, employee_id, derived, variant) {
                            violations.push(v);
                        }
                    }
                }
            }
        }

        ComplianceMatrix::from_violations(
            violations,
            self.source,
            self.load_errors.clone(),
            unevaluated,
        )
    }

    fn check_employee(
        &self,
        rule: &CompiledRule,
        employee_id: &Id,
        derived: &EmployeeDerived,
        variant: &ScheduleVariant,
    ) -> Option<Violation> {
        let make = |description: String,
                    affected_interval: Option<String>,
                    default_cost: f64|
         -> Violation {
            Violation {
                rule_id: rule.id.clone(),
                category: rule.category,
                severity: rule.severity,
                description,
                affected_employee: Some(employee_id.clone()),
                affected_interval,
                remedy_hint: remedy(rule, "Review the schedule for this employee"),
                cost_impact: cost(rule, default_cost),
            }
        };

        match &rule.predicate {
            ConstraintPredicate::WeeklyHoursOver { limit } => {
                (derived.weekly_hours > *limit).then(|| {
                    make(
                        format!(
                            "Weekly hours {:.1} exceed the {:.0}h limit",
                            derived.weekly_hours, limit
                        ),
                        None,
                        derived.weekly_hours * 35.0,
                    )
                })
            }
            ConstraintPredicate::DailyOvertimeOver { limit } => {
                (derived.daily_overtime > *limit).then(|| {
                    make(
                        format!(
                            "Daily overtime {:.1}h exceeds the {:.0}h limit",
                            derived.daily_overtime, limit
                        ),
                        None,
                        derived.daily_overtime * 52.5,
                    )
                })
            }
            ConstraintPredicate::WeeklyOvertimeOver { limit } => {
                (derived.weekly_overtime >= *limit).then(|| {
                    make(
                        format!(
                            "Weekly overtime {:.1}h reached the {:.0}h alert threshold",
                            derived.weekly_overtime, limit
                        ),
                        None,
                        derived.weekly_overtime * 75.0,
                    )
                })
            }
            ConstraintPredicate::MinRestBelow { hours } => {
                (derived.min_rest_hours < *hours).then(|| {
                    make(
                        format!(
                            "Rest period {:.1}h below the {:.0}h minimum",
                            derived.min_rest_hours, hours
                        ),
                        None,
                        500.0,
                    )
                })
            }
            ConstraintPredicate::ConsecutiveDaysOver { limit } => {
                (derived.consecutive_days > *limit).then(|| {
                    make(
                        format!(
                            "{} consecutive work days exceed the limit of {}",
                            derived.consecutive_days, limit
                        ),
                        None,
                        f64::from(derived.consecutive_days) * 100.0,
                    )
                })
            }
            ConstraintPredicate::PartTimeHoursOver { limit } => {
                let employee = self.employees.get(employee_id)?;
                (employee.employment_type == EmploymentType::PartTime
                    && derived.weekly_hours > *limit)
                    .then(|| {
                        make(
                            format!(
                                "Part-time employee scheduled {:.1}h (limit {:.0}h)",
                                derived.weekly_hours, limit
                            ),
                            None,
                            derived.weekly_hours * 40.0,
                        )
                    })
            }
            ConstraintPredicate::RequiredSkillsMissing => {
                let employee = self.employees.get(employee_id)?;
                let missing: BTreeSet<&str> = variant
                    .blocks
                    .iter()
                    .filter(|b| &b.employee_id == employee_id)
                    .flat_map(|b| b.required_skills.iter())
                    .filter(|skill| !employee.skills.contains(*skill))
                    .map(String::as_str)
                    .collect();
                (!missing.is_empty()).then(|| {
                    let list: Vec<&str> = missing.iter().copied().collect();
                    make(
                        format!("Missing required skills: {}", list.join(", ")),
                        None,
                        list.len() as f64 * 1000.0,
                    )
                })
            }
            ConstraintPredicate::UnauthorizedOvertime => {
                let employee = self.employees.get(employee_id)?;
                (!employee.overtime_authorization
                    && derived.weekly_hours > employee.weekly_hours_norm)
                    .then(|| {
                        make(
                            format!(
                                "Scheduled {:.1}h against a {:.0}h norm without overtime authorization",
                                derived.weekly_hours, employee.weekly_hours_norm
                            ),
                            None,
                            (derived.weekly_hours - employee.weekly_hours_norm) * 52.5,
                        )
                    })
            }
            ConstraintPredicate::UnauthorizedNightWork => {
                let employee = self.employees.get(employee_id)?;
                let night_block = variant.blocks.iter().find(|b| {
                    &b.employee_id == employee_id && b.night_minutes() > 0
                })?;
                (!employee.night_permission).then(|| {
                    make(
                        "Night-window work scheduled without night permission".to_string(),
                        Some(night_block.window_label()),
                        200.0,
                    )
                })
            }
            ConstraintPredicate::UnauthorizedWeekendWork => {
                let employee = self.employees.get(employee_id)?;
                let weekend_block = variant.blocks.iter().find(|b| {
                    &b.employee_id == employee_id && (b.is_weekend() || b.days_per_week > 5)
                })?;
                (!employee.weekend_permission).then(|| {
                    make(
                        "Weekend work scheduled without weekend permission".to_string(),
                        Some(weekend_block.date.to_string()),
                        150.0,
                    )
                })
            }
            ConstraintPredicate::PreferenceMismatch => {
                let pref = self.preferences.get(employee_id)?;
                let (start, end) = (pref.preferred_start_min?, pref.preferred_end_min?);
                let mismatch = variant
                    .blocks
                    .iter()
                    .find(|b| {
                        &b.employee_id == employee_id
                            && (b.start_min != start || b.end_min != end)
                    })?;
                Some(make(
                    format!(
                        "Assigned shift {} differs from preferred {:02}:{:02}-{:02}:{:02}",
                        mismatch.window_label(),
                        start / 60,
                        start % 60,
                        end / 60,
                        end % 60
                    ),
                    Some(mismatch.window_label()),
                    25.0,
                ))
            }
            ConstraintPredicate::DayOffScheduled => {
                let pref = self.preferences.get(employee_id)?;
                let scheduled_day_off = variant
                    .blocks
                    .iter()
                    .find(|b| &b.employee_id == employee_id && pref.day_off_dates.contains(&b.date))?;
                Some(make(
                    "Scheduled on a requested day off".to_string(),
                    Some(scheduled_day_off.date.to_string()),
                    100.0,
                ))
            }
            ConstraintPredicate::ContractCheckFailed => Some(make(
                "Contract validation failed for this employee".to_string(),
                None,
                500.0,
            )),
            // Handled at the variant level in `validate`
            ConstraintPredicate::MinCoverageWindow { .. } | ConstraintPredicate::Custom { .. } => {
                None
            }
        }
    }
}

fn remedy(rule: &CompiledRule, default: &str) -> String {
    if rule.remedy_hint.is_empty() {
        default.to_string()
    } else {
        rule.remedy_hint.clone()
    }
}

fn cost(rule: &CompiledRule, default: f64) -> f64 {
    if rule.cost_impact > 0.0 {
        rule.cost_impact
    } else {
        default
    }
}
