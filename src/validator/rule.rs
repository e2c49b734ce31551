//! Rule vocabulary: categories, severities, and compiled predicates.

use serde::{Deserialize, Serialize};

use crate::store::{BusinessRuleRow, RuleRow, WorkRuleRow};
use crate::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    LaborLaw,
    Union,
    Contract,
    Business,
    Preference,
    Schedule,
}

impl RuleCategory {
    pub fn label(self) -> &'static str {
        match self {
            RuleCategory::LaborLaw => "labor_law",
            RuleCategory::Union => "union",
            RuleCategory::Contract => "contract",
            RuleCategory::Business => "business",
            RuleCategory::Preference => "preference",
            RuleCategory::Schedule => "schedule",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Penalty weight in the compliance score.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Critical => 10.0,
            Severity::High => 5.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
        }
    }
}

/// Typed predicate compiled from a declarative rule row.
///
/// The evaluator pattern-matches on these; rule conditions it cannot compile
/// survive as `Custom` and are reported as unevaluated rather than guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintPredicate {
    WeeklyHoursOver { limit: f64 },
    DailyOvertimeOver { limit: f64 },
    WeeklyOvertimeOver { limit: f64 },
    MinRestBelow { hours: f64 },
    ConsecutiveDaysOver { limit: u32 },
    PartTimeHoursOver { limit: f64 },
    RequiredSkillsMissing,
    /// Scheduled past the personal weekly norm without overtime authorization.
    UnauthorizedOvertime,
    /// Night-window work without night permission.
    UnauthorizedNightWork,
    /// Weekend work without weekend permission.
    UnauthorizedWeekendWork,
    MinCoverageWindow { start_hour: u8, end_hour: u8, min_agents: u32 },
    PreferenceMismatch,
    DayOffScheduled,
    ContractCheckFailed,
    Custom { expr: String },
}

/// A rule ready for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub id: Id,
    pub category: RuleCategory,
    pub severity: Severity,
    pub predicate: ConstraintPredicate,
    /// Cost attached to each violation; 0 means "use the evaluator's
    /// per-predicate estimate".
    pub cost_impact: f64,
    pub remedy_hint: String,
    pub applies_to: Option<Id>,
}

impl CompiledRule {
    pub fn new(
        id: impl Into<Id>,
        category: RuleCategory,
        severity: Severity,
        predicate: ConstraintPredicate,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            predicate,
            cost_impact: 0.0,
            remedy_hint: String::new(),
            applies_to: None,
        }
    }

    pub fn with_remedy(mut self, hint: impl Into<String>) -> Self {
        self.remedy_hint = hint.into();
        self
    }
}

/// Compiles a declarative store row into a typed rule.
pub fn compile_rule_row(row: &RuleRow) -> CompiledRule {
    let predicate = match row.kind.as_str() {
        "max_weekly_hours" => ConstraintPredicate::WeeklyHoursOver {
            limit: row.param("limit").unwrap_or(40.0),
        },
        "max_daily_overtime" => ConstraintPredicate::DailyOvertimeOver {
            limit: row.param("limit").unwrap_or(4.0),
        },
        "max_weekly_overtime" => ConstraintPredicate::WeeklyOvertimeOver {
            limit: row.param("limit").unwrap_or(8.0),
        },
        "min_rest_hours" => ConstraintPredicate::MinRestBelow {
            hours: row.param("hours").unwrap_or(11.0),
        },
        "max_consecutive_work_days" => ConstraintPredicate::ConsecutiveDaysOver {
            limit: row.param("max_days").unwrap_or(5.0) as u32,
        },
        "part_time_max_hours" => ConstraintPredicate::PartTimeHoursOver {
            limit: row.param("limit").unwrap_or(20.0),
        },
        "required_skills" => ConstraintPredicate::RequiredSkillsMissing,
        "overtime_authorization" => ConstraintPredicate::UnauthorizedOvertime,
        "night_permission" => ConstraintPredicate::UnauthorizedNightWork,
        "weekend_permission" => ConstraintPredicate::UnauthorizedWeekendWork,
        "min_coverage" => ConstraintPredicate::MinCoverageWindow {
            start_hour: row.param("start_hour").unwrap_or(8.0) as u8,
            end_hour: row.param("end_hour").unwrap_or(18.0) as u8,
            min_agents: row.param("min_agents").unwrap_or(1.0) as u32,
        },
        "preference_window" => ConstraintPredicate::PreferenceMismatch,
        "day_off" => ConstraintPredicate::DayOffScheduled,
        "contract_check_failed" => ConstraintPredicate::ContractCheckFailed,
        other => ConstraintPredicate::Custom {
            expr: other.to_string(),
        },
    };

    CompiledRule {
        id: row.id.clone(),
        category: row.category,
        severity: row.severity,
        predicate,
        cost_impact: row.cost_impact,
        remedy_hint: row.remedy_hint.clone(),
        applies_to: row.applies_to.clone(),
    }
}

/// Work-rules registry rows carry both an inter-shift rest floor and a
/// consecutive-day ceiling; each becomes its own rule.
pub fn compile_work_rule(row: &WorkRuleRow) -> Vec<CompiledRule> {
    vec![
        CompiledRule::new(
            format!("WORK_RULE_{}_REST", row.id),
            RuleCategory::Business,
            Severity::Critical,
            ConstraintPredicate::MinRestBelow {
                hours: row.min_hours_between_shifts,
            },
        )
        .with_remedy(format!(
            "Ensure minimum {}h rest between shifts ('{}')",
            row.min_hours_between_shifts, row.name
        )),
        CompiledRule::new(
            format!("WORK_RULE_{}_CONSECUTIVE", row.id),
            RuleCategory::Business,
            Severity::High,
            ConstraintPredicate::ConsecutiveDaysOver {
                limit: row.max_consecutive_work_days,
            },
        )
        .with_remedy(format!(
            "Limit consecutive work days to {} ('{}')",
            row.max_consecutive_work_days, row.name
        )),
    ]
}

pub fn compile_business_rule(row: &BusinessRuleRow) -> Vec<CompiledRule> {
    let mut rules = Vec::new();
    if let Some(limit) = row.overtime_alert_hours {
        rules.push(
            CompiledRule::new(
                format!("BIZ_RULE_{}_OVERTIME", row.id),
                RuleCategory::Business,
                Severity::High,
                ConstraintPredicate::WeeklyOvertimeOver { limit },
            )
            .with_remedy(format!("Business rule '{}' overtime alert", row.name)),
        );
    }
    if let Some(window) = row.min_coverage {
        rules.push(
            CompiledRule::new(
                format!("BIZ_RULE_{}_COVERAGE", row.id),
                RuleCategory::Business,
                Severity::Critical,
                ConstraintPredicate::MinCoverageWindow {
                    start_hour: window.start_hour,
                    end_hour: window.end_hour,
                    min_agents: window.min_agents,
                },
            )
            .with_remedy("Add coverage during business hours".to_string()),
        );
    }
    rules
}

/// Built-in conservative rule set used when the store is unreachable.
pub fn fallback_rules() -> Vec<CompiledRule> {
    vec![
        CompiledRule::new(
            "FALLBACK_MAX_WEEKLY",
            RuleCategory::LaborLaw,
            Severity::Critical,
            ConstraintPredicate::WeeklyHoursOver { limit: 40.0 },
        )
        .with_remedy("Reduce weekly hours to the 40-hour norm"),
        CompiledRule::new(
            "FALLBACK_MIN_REST",
            RuleCategory::LaborLaw,
            Severity::Critical,
            ConstraintPredicate::MinRestBelow { hours: 11.0 },
        )
        .with_remedy("Extend rest period between shifts"),
        CompiledRule::new(
            "FALLBACK_DAILY_OVERTIME",
            RuleCategory::LaborLaw,
            Severity::High,
            ConstraintPredicate::DailyOvertimeOver { limit: 4.0 },
        )
        .with_remedy("Redistribute overtime across the week"),
        CompiledRule::new(
            "FALLBACK_PART_TIME",
            RuleCategory::Contract,
            Severity::High,
            ConstraintPredicate::PartTimeHoursOver { limit: 20.0 },
        )
        .with_remedy("Reduce hours for part-time employees"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_weights() {
        assert_eq!(Severity::Critical.weight(), 10.0);
        assert_eq!(Severity::High.weight(), 5.0);
        assert_eq!(Severity::Medium.weight(), 2.0);
        assert_eq!(Severity::Low.weight(), 1.0);
    }

    #[test]
    fn known_kinds_compile_to_typed_predicates() {
        let row = RuleRow::new("R1", RuleCategory::LaborLaw, "max_weekly_hours", Severity::Critical)
            .with_param("limit", 48.0);
        let rule = compile_rule_row(&row);
        assert_eq!(
            rule.predicate,
            ConstraintPredicate::WeeklyHoursOver { limit: 48.0 }
        );
    }

    #[test]
    fn missing_params_use_conservative_defaults() {
        let row = RuleRow::new("R2", RuleCategory::LaborLaw, "min_rest_hours", Severity::Critical);
        let rule = compile_rule_row(&row);
        assert_eq!(rule.predicate, ConstraintPredicate::MinRestBelow { hours: 11.0 });
    }

    #[test]
    fn unknown_kind_survives_as_custom() {
        let row = RuleRow::new("R3", RuleCategory::Business, "lunar_phase_check", Severity::Low);
        let rule = compile_rule_row(&row);
        assert_eq!(
            rule.predicate,
            ConstraintPredicate::Custom {
                expr: "lunar_phase_check".to_string()
            }
        );
    }

    #[test]
    fn work_rule_expands_to_rest_and_consecutive() {
        let row = WorkRuleRow {
            id: "7".into(),
            name: "standard".into(),
            min_hours_between_shifts: 12.0,
            max_consecutive_work_days: 6,
        };
        let rules = compile_work_rule(&row);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].predicate, ConstraintPredicate::MinRestBelow { hours: 12.0 });
        assert_eq!(
            rules[1].predicate,
            ConstraintPredicate::ConsecutiveDaysOver { limit: 6 }
        );
    }

    #[test]
    fn fallback_set_is_the_documented_minimum() {
        let rules = fallback_rules();
        assert_eq!(rules.len(), 4);
        assert!(rules
            .iter()
            .any(|r| r.predicate == ConstraintPredicate::WeeklyHoursOver { limit: 40.0 }));
        assert!(rules
            .iter()
            .any(|r| r.predicate == ConstraintPredicate::MinRestBelow { hours: 11.0 }));
        assert!(rules
            .iter()
            .any(|r| r.predicate == ConstraintPredicate::DailyOvertimeOver { limit: 4.0 }));
        assert!(rules
            .iter()
            .any(|r| r.predicate == ConstraintPredicate::PartTimeHoursOver { limit: 20.0 }));
    }
}
