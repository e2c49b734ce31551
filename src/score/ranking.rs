//! Ranked suggestions: ordering, comparison matrix, methodology, summary.

use serde::{Deserialize, Serialize};

use super::breakdown::{OptimizationScore, RiskLevel, ScoringWeights};
use crate::Id;

/// Top-3 side-by-side comparison row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub variant_id: Id,
    pub overall_score: f64,
    pub coverage_score: f64,
    pub cost_score: f64,
    pub compliance_score: f64,
    pub simplicity_score: f64,
    pub risk: RiskLevel,
    pub implementation_weeks: f64,
}

/// How the scores were produced; static description for decision makers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringMethodology {
    pub coverage_weight_pct: f64,
    pub cost_weight_pct: f64,
    pub compliance_weight_pct: f64,
    pub simplicity_weight_pct: f64,
    pub scoring_scale: String,
    pub calculation_method: String,
}

impl ScoringMethodology {
    pub fn for_weights(weights: &ScoringWeights) -> Self {
        Self {
            coverage_weight_pct: weights.coverage * 100.0,
            cost_weight_pct: weights.cost * 100.0,
            compliance_weight_pct: weights.compliance * 100.0,
            simplicity_weight_pct: weights.simplicity * 100.0,
            scoring_scale: "0-100 points".to_string(),
            calculation_method: "Weighted multi-criteria decision analysis".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub excellent: usize,
    pub good: usize,
    pub acceptable: usize,
    pub poor: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReadiness {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentMeans {
    pub coverage: f64,
    pub cost: f64,
    pub compliance: f64,
    pub simplicity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRecommendation {
    pub variant_id: Id,
    pub score: f64,
    pub recommendation: super::breakdown::RecommendationLevel,
    pub risk: RiskLevel,
    pub timeline: String,
}

/// Decision-maker summary over all scored variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub top: Option<TopRecommendation>,
    pub score_distribution: ScoreDistribution,
    pub risk_readiness: RiskReadiness,
    pub average_components: ComponentMeans,
}

/// Ordered suggestions with explanatory context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedSuggestions {
    pub suggestions: Vec<OptimizationScore>,
    pub comparison_matrix: Vec<ComparisonRow>,
    pub methodology: Option<ScoringMethodology>,
    pub summary: RecommendationSummary,
}

/// First number in a timeline string, as weeks (`"2-3 weeks"` is 2).
pub(crate) fn parse_timeline_weeks(window: &str) -> f64 {
    window
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(3.0)
}

pub(crate) fn comparison_matrix(suggestions: &[OptimizationScore]) -> Vec<ComparisonRow> {
    if suggestions.len() < 2 {
        return Vec::new();
    }
    suggestions
        .iter()
        .take(3)
        .map(|s| ComparisonRow {
            variant_id: s.variant_id.clone(),
            overall_score: s.overall_score,
            coverage_score: s.score_breakdown.coverage_score,
            cost_score: s.score_breakdown.cost_score,
            compliance_score: s.score_breakdown.compliance_score,
            simplicity_score: s.score_breakdown.simplicity_score,
            risk: s.risk,
            implementation_weeks: parse_timeline_weeks(&s.implementation_window),
        })
        .collect()
}

pub(crate) fn summarize(suggestions: &[OptimizationScore]) -> RecommendationSummary {
    let mut summary = RecommendationSummary::default();
    if suggestions.is_empty() {
        return summary;
    }

    let top = &suggestions[0];
    summary.top = Some(TopRecommendation {
        variant_id: top.variant_id.clone(),
        score: top.overall_score,
        recommendation: top.recommendation_level,
        risk: top.risk,
        timeline: top.implementation_window.clone(),
    });

    for s in suggestions {
        match s.overall_score {
            x if x >= 90.0 => summary.score_distribution.excellent += 1,
            x if x >= 75.0 => summary.score_distribution.good += 1,
            x if x >= 60.0 => summary.score_distribution.acceptable += 1,
            _ => summary.score_distribution.poor += 1,
        }
        match s.risk {
            RiskLevel::Low => summary.risk_readiness.low += 1,
            RiskLevel::Medium => summary.risk_readiness.medium += 1,
            RiskLevel::High => summary.risk_readiness.high += 1,
        }
    }

    let n = suggestions.len() as f64;
    summary.average_components = ComponentMeans {
        coverage: suggestions.iter().map(|s| s.score_breakdown.coverage_score).sum::<f64>() / n,
        cost: suggestions.iter().map(|s| s.score_breakdown.cost_score).sum::<f64>() / n,
        compliance: suggestions
            .iter()
            .map(|s| s.score_breakdown.compliance_score)
            .sum::<f64>()
            / n,
        simplicity: suggestions
            .iter()
            .map(|s| s.score_breakdown.simplicity_score)
            .sum::<f64>()
            / n,
    };
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::breakdown::{RecommendationLevel, ScoreBreakdown};

    fn score(id: &str, total: f64, risk: RiskLevel) -> OptimizationScore {
        OptimizationScore {
            variant_id: id.into(),
            overall_score: total,
            score_breakdown: ScoreBreakdown {
                total_score: total,
                ..ScoreBreakdown::default()
            },
            rank: 0,
            recommendation_level: RecommendationLevel::Monitor,
            risk,
            implementation_window: "2-3 weeks".into(),
            expected_outcomes: Default::default(),
        }
    }

    #[test]
    fn timeline_parsing_takes_the_first_number() {
        assert_eq!(parse_timeline_weeks("1-2 weeks"), 1.0);
        assert_eq!(parse_timeline_weeks("4-6 weeks"), 4.0);
        assert_eq!(parse_timeline_weeks("unknown"), 3.0);
    }

    #[test]
    fn comparison_needs_at_least_two_suggestions() {
        let one = vec![score("VAR_000", 80.0, RiskLevel::Low)];
        assert!(comparison_matrix(&one).is_empty());

        let three: Vec<_> = (0..4)
            .map(|i| score(&format!("VAR_{i:03}"), 90.0 - i as f64, RiskLevel::Low))
            .collect();
        assert_eq!(comparison_matrix(&three).len(), 3);
    }

    #[test]
    fn summary_buckets_scores_and_risk() {
        let suggestions = vec![
            score("VAR_000", 95.0, RiskLevel::Low),
            score("VAR_001", 80.0, RiskLevel::Medium),
            score("VAR_002", 65.0, RiskLevel::Medium),
            score("VAR_003", 40.0, RiskLevel::High),
        ];
        let summary = summarize(&suggestions);
        assert_eq!(summary.score_distribution.excellent, 1);
        assert_eq!(summary.score_distribution.good, 1);
        assert_eq!(summary.score_distribution.acceptable, 1);
        assert_eq!(summary.score_distribution.poor, 1);
        assert_eq!(summary.risk_readiness.medium, 2);
        assert_eq!(summary.top.as_ref().unwrap().variant_id, "VAR_000");
    }
}
