//! Compliance matrix: the aggregate of all violations for a variant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rule::{RuleCategory, Severity};
use crate::Id;

/// Where the evaluated rule set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    Store,
    Fallback,
}

/// A rule predicate that evaluated to "fail" on a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: Id,
    pub category: RuleCategory,
    pub severity: Severity,
    pub description: String,
    pub affected_employee: Option<Id>,
    pub affected_interval: Option<String>,
    pub remedy_hint: String,
    pub cost_impact: f64,
}

/// Summary block carried alongside the raw violation list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub critical_issues: usize,
    pub high_priority: usize,
    pub total_cost_impact: f64,
    pub most_common_category: Option<String>,
    pub recommendations: Vec<String>,
    /// Store faults absorbed during rule loading; informational only.
    pub store_errors: Vec<String>,
    /// Rules whose conditions could not be compiled; counted nowhere.
    pub unevaluated_rules: Vec<Id>,
}

/// Complete compliance validation result for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceMatrix {
    pub total_violations: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_category: BTreeMap<RuleCategory, usize>,
    /// `max(0, 100 - Σ severity_weight × count)`.
    pub compliance_score: f64,
    pub violations: Vec<Violation>,
    pub validation_summary: ValidationSummary,
    pub source: RuleSource,
}

impl ComplianceMatrix {
    /// Builds the matrix from a violation list, computing all aggregates.
    pub fn from_violations(
        violations: Vec<Violation>,
        source: RuleSource,
        store_errors: Vec<String>,
        unevaluated_rules: Vec<Id>,
    ) -> Self {
        let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
        let mut by_category: BTreeMap<RuleCategory, usize> = BTreeMap::new();
        for v in &violations {
            *by_severity.entry(v.severity).or_default() += 1;
            *by_category.entry(v.category).or_default() += 1;
        }

        let penalty: f64 = violations.iter().map(|v| v.severity.weight()).sum();
        let compliance_score = (100.0 - penalty).max(0.0);

        let summary = ValidationSummary {
            critical_issues: by_severity.get(&Severity::Critical).copied().unwrap_or(0),
            high_priority: by_severity.get(&Severity::High).copied().unwrap_or(0),
            total_cost_impact: violations.iter().map(|v| v.cost_impact).sum(),
            most_common_category: most_common(&by_category),
            recommendations: recommendations(&violations, &by_category),
            store_errors,
            unevaluated_rules,
        };

        Self {
            total_violations: violations.len(),
            by_severity,
            by_category,
            compliance_score,
            violations,
            validation_summary: summary,
            source,
        }
    }

    /// A clean matrix for a variant with nothing to flag.
    pub fn clean(source: RuleSource) -> Self {
        Self::from_violations(Vec::new(), source, Vec::new(), Vec::new())
    }
}

fn most_common(by_category: &BTreeMap<RuleCategory, usize>) -> Option<String> {
    by_category
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(category, count)| format!("{} ({count} violations)", category.label()))
}

/// Remediation pointers for the worst problem areas, capped at five.
fn recommendations(
    violations: &[Violation],
    by_category: &BTreeMap<RuleCategory, usize>,
) -> Vec<String> {
    let mut out = Vec::new();

    if violations.iter().any(|v| v.severity == Severity::Critical) {
        out.push("URGENT: Address critical violations before schedule implementation".to_string());
    }
    if by_category.contains_key(&RuleCategory::LaborLaw) {
        out.push("Review labor law compliance for the flagged employees".to_string());
    }
    if by_category.contains_key(&RuleCategory::Contract) {
        out.push("Check employee contracts and employment types".to_string());
    }
    if by_category.contains_key(&RuleCategory::Business) {
        out.push("Review business rule thresholds for automated compliance".to_string());
    }
    if by_category.contains_key(&RuleCategory::Preference) {
        out.push("Consider schedule preferences to improve satisfaction".to_string());
    }

    let total_cost: f64 = violations.iter().map(|v| v.cost_impact).sum();
    if total_cost > 5000.0 {
        out.push(format!(
            "High cost impact ({total_cost:.2}) - prioritize constraint fixes"
        ));
    }

    out.truncate(5);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(severity: Severity, category: RuleCategory, cost: f64) -> Violation {
        Violation {
            rule_id: "R".into(),
            category,
            severity,
            description: String::new(),
            affected_employee: None,
            affected_interval: None,
            remedy_hint: String::new(),
            cost_impact: cost,
        }
    }

    #[test]
    fn clean_matrix_scores_one_hundred() {
        let matrix = ComplianceMatrix::clean(RuleSource::Store);
        assert_eq!(matrix.compliance_score, 100.0);
        assert_eq!(matrix.total_violations, 0);
    }

    #[test]
    fn score_subtracts_severity_weights() {
        let matrix = ComplianceMatrix::from_violations(
            vec![
                violation(Severity::Critical, RuleCategory::LaborLaw, 0.0),
                violation(Severity::High, RuleCategory::Business, 0.0),
                violation(Severity::Medium, RuleCategory::Contract, 0.0),
                violation(Severity::Low, RuleCategory::Preference, 0.0),
            ],
            RuleSource::Store,
            Vec::new(),
            Vec::new(),
        );
        // 100 - (10 + 5 + 2 + 1)
        assert_eq!(matrix.compliance_score, 82.0);
    }

    #[test]
    fn score_floors_at_zero() {
        let violations = (0..15)
            .map(|_| violation(Severity::Critical, RuleCategory::LaborLaw, 0.0))
            .collect();
        let matrix =
            ComplianceMatrix::from_violations(violations, RuleSource::Store, Vec::new(), Vec::new());
        assert_eq!(matrix.compliance_score, 0.0);
    }

    #[test]
    fn summary_counts_and_costs() {
        let matrix = ComplianceMatrix::from_violations(
            vec![
                violation(Severity::Critical, RuleCategory::LaborLaw, 500.0),
                violation(Severity::Critical, RuleCategory::LaborLaw, 300.0),
                violation(Severity::High, RuleCategory::Business, 100.0),
            ],
            RuleSource::Store,
            Vec::new(),
            Vec::new(),
        );
        let summary = &matrix.validation_summary;
        assert_eq!(summary.critical_issues, 2);
        assert_eq!(summary.high_priority, 1);
        assert_eq!(summary.total_cost_impact, 900.0);
        assert_eq!(
            summary.most_common_category.as_deref(),
            Some("labor_law (2 violations)")
        );
        assert!(summary.recommendations[0].starts_with("URGENT"));
    }
}
