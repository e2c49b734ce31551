//! Multi-criteria scoring: combines gap, cost, compliance, and simplicity
//! metrics into a transparent weighted score and ranks variants.

mod breakdown;
mod ranking;

pub use breakdown::{
    ExpectedOutcomes, OptimizationScore, RecommendationLevel, RiskLevel, ScoreBreakdown,
    ScoringWeights, SubComponents, WeightError,
};
pub use ranking::{
    ComparisonRow, ComponentMeans, RankedSuggestions, RecommendationSummary, RiskReadiness,
    ScoreDistribution, ScoringMethodology, TopRecommendation,
};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::{CostComponent, CostQuality, FinancialImpact};
use crate::gap::GapReport;
use crate::model::{OptimizationTargets, ScheduleVariant};
use crate::store::{MetricsStore, OptimizationOutcome};
use crate::validator::{ComplianceMatrix, RuleCategory};
use crate::Id;

/// One variant with the stage reports the scorer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantEvaluation {
    pub variant: ScheduleVariant,
    pub financial: FinancialImpact,
    pub compliance: ComplianceMatrix,
    /// Skills available in the employee pool behind this variant.
    pub available_skills: BTreeSet<Id>,
    /// Whether any shift preferences exist for the scheduled employees;
    /// without them the preference half mirrors the labor half.
    pub has_preference_data: bool,
}

/// Current-schedule reference values the deltas are measured against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringBaseline {
    pub total_gaps: u32,
    pub current_weekly_cost: f64,
    pub current_overtime_cost: f64,
}

/// Multi-criteria scoring engine.
///
/// # Contract
///
/// `score` is a pure function of its inputs. Historical outcomes from the
/// store refine the expected-outcome projections; they are loaded once at
/// construction so a slow store can never stall the scoring stage.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    history: Vec<OptimizationOutcome>,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures optimization history for outcome projections; unavailable
    /// stores degrade to the documented defaults.
    pub fn from_store(store: &dyn MetricsStore) -> Self {
        let history = store.optimization_history(10).unwrap_or_else(|e| {
            debug!("optimization history unavailable: {e}");
            Vec::new()
        });
        Self {
            weights: ScoringWeights::default(),
            history,
        }
    }

    /// Replaces the component weights; they must sum to 1.0.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Result<Self, WeightError> {
        self.weights = weights.validated()?;
        Ok(self)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Scores and ranks the evaluated variants against the run's targets.
    pub fn score(
        &self,
        evaluations: &[VariantEvaluation],
        gap_report: &GapReport,
        baseline: &ScoringBaseline,
        targets: &OptimizationTargets,
    ) -> RankedSuggestions {
        let mut suggestions: Vec<OptimizationScore> = evaluations
            .iter()
            .map(|eval| self.score_one(eval, gap_report, baseline, targets))
            .collect();

        // Total order: score, then compliance, simplicity, cheaper overtime,
        // and finally variant id.
        let overtime = |id: &Id| -> f64 {
            evaluations
                .iter()
                .find(|e| &e.variant.variant_id == id)
                .map(|e| e.financial.component_total(CostComponent::Overtime))
                .unwrap_or(0.0)
        };
        suggestions.sort_by(|a, b| {
            b.overall_score
                .total_cmp(&a.overall_score)
                .then_with(|| {
                    b.score_breakdown
                        .compliance_score
                        .total_cmp(&a.score_breakdown.compliance_score)
                })
                .then_with(|| {
                    b.score_breakdown
                        .simplicity_score
                        .total_cmp(&a.score_breakdown.simplicity_score)
                })
                .then_with(|| overtime(&a.variant_id).total_cmp(&overtime(&b.variant_id)))
                .then_with(|| a.variant_id.cmp(&b.variant_id))
        });

        // Dense 1-based ranks: equal totals share a rank.
        let mut rank = 0u32;
        let mut last_score = f64::NAN;
        for suggestion in suggestions.iter_mut() {
            if suggestion.overall_score != last_score {
                rank += 1;
                last_score = suggestion.overall_score;
            }
            suggestion.rank = rank;
        }

        let comparison_matrix = ranking::comparison_matrix(&suggestions);
        let summary = ranking::summarize(&suggestions);
        RankedSuggestions {
            comparison_matrix,
            methodology: Some(ScoringMethodology::for_weights(&self.weights)),
            summary,
            suggestions,
        }
    }

    fn score_one(
        &self,
        eval: &VariantEvaluation,
        gap_report: &GapReport,
        baseline: &ScoringBaseline,
        targets: &OptimizationTargets,
    ) -> OptimizationScore {
        let w = &self.weights;
        let sub = self.sub_components(eval, gap_report, baseline);

        let coverage_score =
            (sub.gap_reduction + sub.peak_coverage + sub.skill_match).min(w.coverage_max());
        let cost_score = (sub.overtime_reduction + sub.cost_reduction).min(w.cost_max());
        let compliance_score =
            (sub.labor_compliance + sub.preference_satisfaction).min(w.compliance_max());
        let simplicity_score = sub.pattern_regularity;
        let total_score = coverage_score + cost_score + compliance_score + simplicity_score;

        // Critical rules failing dominate every other signal.
        let compliance_floor = 0.75 * w.compliance_max();
        let mut risk = if compliance_score < compliance_floor {
            RiskLevel::High
        } else if total_score >= 90.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };

        let implementation_window = if compliance_score < compliance_floor {
            "4-6 weeks"
        } else if simplicity_score >= 0.8 * w.simplicity_max() {
            "1-2 weeks"
        } else if simplicity_score >= 0.6 * w.simplicity_max() {
            "2-3 weeks"
        } else {
            "3-4 weeks"
        }
        .to_string();

        let mut recommendation_level = if total_score >= 90.0 && risk == RiskLevel::Low {
            RecommendationLevel::Implement
        } else if total_score >= 75.0 {
            RecommendationLevel::Monitor
        } else {
            RecommendationLevel::PlanAccordingly
        };

        // Infeasible cost analyses are retained, never silently dropped,
        // but always land at plan-accordingly with high risk.
        if eval.financial.quality == CostQuality::Infeasible {
            recommendation_level = RecommendationLevel::PlanAccordingly;
            risk = RiskLevel::High;
        }

        OptimizationScore {
            variant_id: eval.variant.variant_id.clone(),
            overall_score: total_score,
            score_breakdown: ScoreBreakdown {
                coverage_score,
                cost_score,
                compliance_score,
                simplicity_score,
                total_score,
                sub_components: sub,
            },
            rank: 0,
            recommendation_level,
            risk,
            implementation_window,
            expected_outcomes: self.expected_outcomes(targets),
        }
    }

    fn sub_components(
        &self,
        eval: &VariantEvaluation,
        gap_report: &GapReport,
        baseline: &ScoringBaseline,
    ) -> SubComponents {
        let w = &self.weights;
        let variant = &eval.variant;

        // Coverage: gap reduction (37.5%), peak coverage (37.5%), skill
        // match (25%) of the coverage scale.
        let gap_max = w.coverage_max() * 0.375;
        let peak_max = w.coverage_max() * 0.375;
        let skill_max = w.coverage_max() * 0.25;

        let projected_gaps: u32 = gap_report
            .interval_gaps
            .iter()
            .filter(|g| g.gap_count > 0 && !variant.covers_hour(g.interval.hour()))
            .map(|g| g.gap_count)
            .sum();
        let gap_reduction = if baseline.total_gaps > 0 {
            let ratio = f64::from(baseline.total_gaps.saturating_sub(projected_gaps))
                / f64::from(baseline.total_gaps);
            (ratio.min(1.0) * gap_max * 5.0 / 3.0).min(gap_max)
        } else {
            // nothing left to reduce is perfect coverage
            gap_max
        };

        let peak_coverage = if gap_report.peak_intervals.is_empty() {
            peak_max
        } else {
            let covered = gap_report
                .peak_intervals
                .iter()
                .filter(|slot| variant.covers_hour(slot.hour()))
                .count();
            covered as f64 / gap_report.peak_intervals.len() as f64 * peak_max
        };

        let required = variant.required_skills();
        let skill_match = if required.is_empty() {
            skill_max
        } else {
            let available: BTreeSet<&str> =
                eval.available_skills.iter().map(String::as_str).collect();
            let matched = required.intersection(&available).count();
            matched as f64 / required.len() as f64 * skill_max
        };

        // Cost: overtime reduction (40%) and total cost reduction (60%).
        let overtime_max = w.cost_max() * 0.4;
        let cost_max = w.cost_max() * 0.6;

        let projected_overtime = eval.financial.component_total(CostComponent::Overtime);
        let overtime_reduction = if baseline.current_overtime_cost > 0.0 {
            reduction_ratio(baseline.current_overtime_cost, projected_overtime) * overtime_max
        } else {
            // no overtime to reduce is the best possible overtime position
            overtime_max
        };
        let cost_reduction = reduction_ratio(
            baseline.current_weekly_cost,
            eval.financial.total_weekly_cost,
        ) * cost_max;

        // Compliance: labor score and preference satisfaction, half each.
        // Absent preference data the second half mirrors the first, so the
        // component equals the validator's (100 - penalty) scaled to 20.
        let labor_max = w.compliance_max() * 0.5;
        let pref_max = w.compliance_max() * 0.5;
        let labor_compliance = eval.compliance.compliance_score / 100.0 * labor_max;
        let preference_satisfaction = if eval.has_preference_data {
            preference_ratio(eval) * pref_max
        } else {
            eval.compliance.compliance_score / 100.0 * pref_max
        };

        // Simplicity: archetype base minus per-block layout penalties.
        let scale = w.simplicity_max() / 10.0;
        let mut simplicity = variant.pattern_type.simplicity_base() * scale;
        for block in &variant.blocks {
            if block.overlap_shift {
                simplicity -= 0.5 * scale;
            }
            if block.shift_part.is_some() {
                simplicity -= 1.0 * scale;
            }
            if block.compressed_schedule {
                simplicity -= 0.5 * scale;
            }
        }
        let pattern_regularity = simplicity.clamp(0.0, w.simplicity_max());

        SubComponents {
            gap_reduction,
            peak_coverage,
            skill_match,
            overtime_reduction,
            cost_reduction,
            labor_compliance,
            preference_satisfaction,
            pattern_regularity,
        }
    }

    /// Projected outcomes: the run's targets when no history exists,
    /// refined from historical optimization results otherwise.
    fn expected_outcomes(&self, targets: &OptimizationTargets) -> ExpectedOutcomes {
        if self.history.is_empty() {
            return ExpectedOutcomes {
                coverage_improvement: targets.coverage_improvement_pct,
                cost_savings: targets.cost_reduction_pct,
                service_level_improvement: targets.service_level_improvement_pct,
                ..ExpectedOutcomes::default()
            };
        }
        let n = self.history.len() as f64;
        let avg_improvement =
            self.history.iter().map(|o| o.improvement_pct).sum::<f64>() / n;
        let avg_execution_ms = self
            .history
            .iter()
            .map(|o| o.execution_time_ms as f64)
            .sum::<f64>()
            / n;

        ExpectedOutcomes {
            coverage_improvement: avg_improvement.max(5.0),
            cost_savings: (avg_improvement * 0.7).max(3.0),
            service_level_improvement: (avg_improvement * 0.4).max(2.0),
            employee_satisfaction: (60.0 + avg_improvement * 0.8).min(85.0),
            implementation_confidence: (100.0 - (avg_execution_ms / 100.0).min(50.0)).max(70.0),
        }
    }
}

fn reduction_ratio(current: f64, projected: f64) -> f64 {
    if current > 0.0 {
        ((current - projected) / current).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fraction of scheduled employees without a preference-mismatch violation.
fn preference_ratio(eval: &VariantEvaluation) -> f64 {
    let employees = eval.variant.employee_ids();
    if employees.is_empty() {
        return 1.0;
    }
    let mismatched: BTreeSet<&str> = eval
        .compliance
        .violations
        .iter()
        .filter(|v| v.category == RuleCategory::Preference)
        .filter_map(|v| v.affected_employee.as_deref())
        .collect();
    1.0 - mismatched.len() as f64 / employees.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::GapAnalyzer;
    use crate::model::{PatternType, ShiftBlock, ShiftPart, Slot};
    use crate::validator::{RuleSource, Severity, Violation};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    fn gap_report(entries: &[(u8, u32, u32)]) -> GapReport {
        let forecast: BTreeMap<Slot, u32> = entries
            .iter()
            .map(|&(h, req, _)| (Slot::hourly(h), req))
            .collect();
        let schedule: BTreeMap<Slot, u32> = entries
            .iter()
            .map(|&(h, _, sch)| (Slot::hourly(h), sch))
            .collect();
        GapAnalyzer::new().analyze(&forecast, &schedule)
    }

    fn evaluation(variant: ScheduleVariant) -> VariantEvaluation {
        VariantEvaluation {
            variant,
            financial: FinancialImpact::zero(CostQuality::Exact),
            compliance: ComplianceMatrix::clean(RuleSource::Store),
            available_skills: BTreeSet::new(),
            has_preference_data: false,
        }
    }

    fn full_coverage_variant(id: &str, pattern: PatternType) -> ScheduleVariant {
        ScheduleVariant::new(
            id,
            pattern,
            vec![
                ShiftBlock::from_hours("E1", date(), 8, 16),
                ShiftBlock::from_hours("E2", date(), 10, 18),
            ],
        )
    }

    // ── component scoring ─────────────────────────────────────────────

    #[test]
    fn fully_covering_variant_maxes_coverage() {
        let gaps = gap_report(&[(9, 2, 2), (10, 2, 2)]);
        let eval = evaluation(full_coverage_variant("VAR_000", PatternType::Traditional));
        let ranked = ScoringEngine::new().score(&[eval], &gaps, &ScoringBaseline::default(), &OptimizationTargets::default());
        let breakdown = &ranked.suggestions[0].score_breakdown;
        // no gaps, no peaks, no skills required: every coverage sub maxes
        assert_eq!(breakdown.coverage_score, 40.0);
    }

    #[test]
    fn components_stay_in_their_subranges() {
        let gaps = gap_report(&[(10, 10, 2), (11, 10, 2)]);
        let baseline = ScoringBaseline {
            total_gaps: gaps.total_gaps,
            current_weekly_cost: 10_000.0,
            current_overtime_cost: 1_000.0,
        };
        let eval = evaluation(full_coverage_variant("VAR_000", PatternType::Flexible));
        let ranked = ScoringEngine::new().score(&[eval], &gaps, &baseline, &OptimizationTargets::default());
        let b = &ranked.suggestions[0].score_breakdown;
        assert!((0.0..=40.0).contains(&b.coverage_score));
        assert!((0.0..=30.0).contains(&b.cost_score));
        assert!((0.0..=20.0).contains(&b.compliance_score));
        assert!((0.0..=10.0).contains(&b.simplicity_score));
        let total = b.coverage_score + b.cost_score + b.compliance_score + b.simplicity_score;
        assert!((b.total_score - total).abs() < 1e-9);
    }

    #[test]
    fn split_pattern_pays_a_simplicity_penalty() {
        let gaps = GapReport::empty();
        let traditional = evaluation(full_coverage_variant("VAR_000", PatternType::Traditional));
        let split = evaluation(ScheduleVariant::new(
            "VAR_001",
            PatternType::SplitShift,
            vec![
                ShiftBlock::from_hours("E1", date(), 8, 12).with_part(ShiftPart::FirstHalf),
                ShiftBlock::from_hours("E1", date(), 14, 18).with_part(ShiftPart::SecondHalf),
            ],
        ));
        let ranked =
            ScoringEngine::new().score(&[traditional, split], &gaps, &ScoringBaseline::default(), &OptimizationTargets::default());
        let by_id = |id: &str| {
            ranked
                .suggestions
                .iter()
                .find(|s| s.variant_id == id)
                .unwrap()
                .score_breakdown
                .simplicity_score
        };
        assert!(by_id("VAR_000") - by_id("VAR_001") >= 6.0);
    }

    #[test]
    fn compliance_violations_lower_the_component() {
        let gaps = GapReport::empty();
        let mut eval = evaluation(full_coverage_variant("VAR_000", PatternType::Traditional));
        eval.compliance = ComplianceMatrix::from_violations(
            vec![Violation {
                rule_id: "LAB_001".into(),
                category: RuleCategory::LaborLaw,
                severity: Severity::Critical,
                description: "65h week".into(),
                affected_employee: Some("E1".into()),
                affected_interval: None,
                remedy_hint: String::new(),
                cost_impact: 0.0,
            }],
            RuleSource::Store,
            Vec::new(),
            Vec::new(),
        );
        let ranked = ScoringEngine::new().score(&[eval], &gaps, &ScoringBaseline::default(), &OptimizationTargets::default());
        let compliance = ranked.suggestions[0].score_breakdown.compliance_score;
        assert!(compliance <= 18.0 + 1e-9);
    }

    // ── ranking and risk ──────────────────────────────────────────────

    #[test]
    fn ranking_is_descending_and_dense() {
        let gaps = gap_report(&[(10, 10, 2)]);
        let baseline = ScoringBaseline {
            total_gaps: gaps.total_gaps,
            ..ScoringBaseline::default()
        };
        let evals = vec![
            evaluation(full_coverage_variant("VAR_000", PatternType::SplitShift)),
            evaluation(full_coverage_variant("VAR_001", PatternType::Traditional)),
            evaluation(full_coverage_variant("VAR_002", PatternType::Flexible)),
        ];
        let ranked = ScoringEngine::new().score(&evals, &gaps, &baseline, &OptimizationTargets::default());
        for pair in ranked.suggestions.windows(2) {
            assert!(pair[0].overall_score >= pair[1].overall_score);
            assert!(pair[1].rank >= pair[0].rank);
        }
        assert_eq!(ranked.suggestions[0].rank, 1);
    }

    #[test]
    fn low_compliance_forces_high_risk_and_long_window() {
        let gaps = GapReport::empty();
        let mut eval = evaluation(full_coverage_variant("VAR_000", PatternType::Traditional));
        let violations = (0..10)
            .map(|i| Violation {
                rule_id: format!("R{i}"),
                category: RuleCategory::LaborLaw,
                severity: Severity::Critical,
                description: String::new(),
                affected_employee: None,
                affected_interval: None,
                remedy_hint: String::new(),
                cost_impact: 0.0,
            })
            .collect();
        eval.compliance =
            ComplianceMatrix::from_violations(violations, RuleSource::Store, Vec::new(), Vec::new());
        let ranked = ScoringEngine::new().score(&[eval], &gaps, &ScoringBaseline::default(), &OptimizationTargets::default());
        let top = &ranked.suggestions[0];
        assert_eq!(top.risk, RiskLevel::High);
        assert_eq!(top.implementation_window, "4-6 weeks");
    }

    #[test]
    fn infeasible_cost_is_retained_but_demoted() {
        let gaps = GapReport::empty();
        let mut eval = evaluation(full_coverage_variant("VAR_000", PatternType::Traditional));
        eval.financial = FinancialImpact::infeasible("pool too small");
        let ranked = ScoringEngine::new().score(&[eval], &gaps, &ScoringBaseline::default(), &OptimizationTargets::default());
        assert_eq!(ranked.suggestions.len(), 1);
        let top = &ranked.suggestions[0];
        assert_eq!(top.recommendation_level, RecommendationLevel::PlanAccordingly);
        assert_eq!(top.risk, RiskLevel::High);
    }

    #[test]
    fn comparison_matrix_covers_top_three() {
        let gaps = GapReport::empty();
        let evals: Vec<_> = (0..4)
            .map(|i| {
                evaluation(full_coverage_variant(
                    &format!("VAR_{i:03}"),
                    PatternType::Traditional,
                ))
            })
            .collect();
        let ranked = ScoringEngine::new().score(&evals, &gaps, &ScoringBaseline::default(), &OptimizationTargets::default());
        assert_eq!(ranked.comparison_matrix.len(), 3);
    }

    #[test]
    fn bad_weights_are_rejected() {
        let result = ScoringEngine::new().with_weights(ScoringWeights {
            coverage: 0.9,
            cost: 0.3,
            compliance: 0.2,
            simplicity: 0.1,
        });
        assert!(result.is_err());
    }

    #[test]
    fn scoring_is_repeatable() {
        let gaps = gap_report(&[(10, 10, 4)]);
        let baseline = ScoringBaseline {
            total_gaps: gaps.total_gaps,
            current_weekly_cost: 10_000.0,
            current_overtime_cost: 1_000.0,
        };
        let evals = vec![evaluation(full_coverage_variant(
            "VAR_000",
            PatternType::Traditional,
        ))];
        let engine = ScoringEngine::new();
        assert_eq!(
            engine.score(&evals, &gaps, &baseline, &OptimizationTargets::default()),
            engine.score(&evals, &gaps, &baseline, &OptimizationTargets::default())
        );
    }

    #[test]
    fn history_refines_expected_outcomes() {
        let engine = ScoringEngine {
            weights: ScoringWeights::default(),
            history: vec![
                OptimizationOutcome {
                    algorithm: "genetic_algorithm".into(),
                    improvement_pct: 20.0,
                    execution_time_ms: 2_000,
                },
                OptimizationOutcome {
                    algorithm: "genetic_algorithm".into(),
                    improvement_pct: 10.0,
                    execution_time_ms: 4_000,
                },
            ],
        };
        let outcomes = engine.expected_outcomes(&OptimizationTargets::default());
        assert_eq!(outcomes.coverage_improvement, 15.0);
        assert!((outcomes.cost_savings - 10.5).abs() < 1e-9);
        assert_eq!(outcomes.implementation_confidence, 70.0);
    }
}
