//! Optimization orchestrator: sequences the pipeline stages under per-stage
//! budgets and a hard 60-second run deadline.

mod budget;
mod bulk;
mod plan;

pub use budget::{
    CancelToken, StageTimings, COST_BUDGET, GAP_BUDGET, GENERATOR_BUDGET, RUN_DEADLINE,
    SCORING_BUDGET, SLOW_RUN_ALERT, VALIDATOR_BUDGET,
};
pub use bulk::{
    BudgetReport, BulkConstraints, BulkOperationResult, CombinedImpact, ConflictReport,
    EmployeeConflict, ResourceReport,
};
pub use plan::{ImplementationPlan, RollbackProcedure};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cost::{CostCalculator, CostComponent, FinancialImpact};
use crate::gap::{GapAnalyzer, GapReport};
use crate::generator::{GeneratorConstraints, PatternGenerator, VariantSource};
use crate::model::{
    Employee, OptimizationTargets, PatternType, ScheduleVariant, ShiftBlock, Slot,
};
use crate::score::{RankedSuggestions, ScoringBaseline, ScoringEngine, VariantEvaluation};
use crate::store::{DateRange, MetricsStore, ScheduleLoader};
use crate::validator::{ComplianceMatrix, ConstraintValidator, RuleSource};
use crate::Id;

use budget::StageClock;

/// How the suggestions are meant to be rolled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    ImmediateFull,
    Phased,
    Pilot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Timeout,
    Degraded,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RunError {
    #[error("invalid optimization request: {0}")]
    InvalidInput(String),

    #[error("optimization run was cancelled")]
    Cancelled,
}

/// Request envelope consumed by [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub service_id: String,
    /// Freeform optimization goals, e.g. `"coverage"`, `"cost"`.
    pub goals: Vec<String>,
    pub constraints: GeneratorConstraints,
    pub targets: OptimizationTargets,
    pub mode: OptimizationMode,
    pub request_id: Option<Id>,
}

impl OptimizationRequest {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, service_id: impl Into<String>) -> Self {
        Self {
            start_date,
            end_date,
            service_id: service_id.into(),
            goals: Vec::new(),
            constraints: GeneratorConstraints::default(),
            targets: OptimizationTargets::default(),
            mode: OptimizationMode::Phased,
            request_id: None,
        }
    }

    pub fn with_mode(mut self, mode: OptimizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_goals(mut self, goals: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.goals = goals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_targets(mut self, targets: OptimizationTargets) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_constraints(mut self, constraints: GeneratorConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_request_id(mut self, id: impl Into<Id>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Validation snapshot of the current schedule, exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResults {
    pub compliance_score: f64,
    pub total_violations: usize,
    pub critical_issues: usize,
    pub validation_passed: bool,
    pub source: RuleSource,
}

/// Run-level analysis context carried alongside the suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub variants_analyzed: usize,
    pub total_gaps: u32,
    pub gap_coverage_score: f64,
    pub current_weekly_cost: f64,
    pub stage_timings: StageTimings,
    pub degraded_stages: Vec<String>,
    /// Run exceeded the 30-second alerting threshold (non-fatal).
    pub slow: bool,
}

/// Result envelope produced by [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub request_id: Id,
    pub suggestions: RankedSuggestions,
    pub analysis_metadata: AnalysisMetadata,
    pub validation_results: ValidationResults,
    pub implementation_plan: ImplementationPlan,
    pub processing_time_ms: f64,
    pub algorithms_used: Vec<String>,
    /// Input completeness in `[0, 100]`.
    pub data_quality: f64,
    /// `[80, 100]`; base 85 adjusted by gap coverage and compliance.
    pub recommendation_confidence: f64,
    pub status: RunStatus,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Seed for the evolutionary search; fixed seed means reproducible runs.
    pub seed: u64,
    /// Cost of one uncovered agent-hour fed to the gap analyzer.
    pub gap_hourly_cost: f64,
    pub run_deadline: Duration,
    pub slow_alert: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            gap_hourly_cost: crate::gap::DEFAULT_UNCOVERED_AGENT_HOURLY_COST,
            run_deadline: RUN_DEADLINE,
            slow_alert: SLOW_RUN_ALERT,
        }
    }
}

/// Master orchestrator over the six-stage pipeline.
///
/// The pipeline is strictly sequential stage to stage; the validator and
/// cost calculator fan out across variants on the worker pool. Rule,
/// profile, and history caches are scoped to one run and populated at run
/// entry. Cancellation propagates into the fan-out; a cancelled run returns
/// [`RunError::Cancelled`] without partial writes (there is no shared
/// mutable state to revert).
pub struct Orchestrator {
    store: Arc<dyn MetricsStore>,
    loader: Arc<dyn ScheduleLoader>,
    generator: Arc<dyn VariantSource>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn MetricsStore>, loader: Arc<dyn ScheduleLoader>) -> Self {
        Self {
            store,
            loader,
            generator: Arc::new(PatternGenerator::new()),
            config: OrchestratorConfig::default(),
        }
    }

    /// Replaces the variant source; used to script generator behavior.
    pub fn with_generator(mut self, generator: Arc<dyn VariantSource>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn run(&self, request: &OptimizationRequest) -> Result<RunResult, RunError> {
        self.run_with_cancel(request, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        request: &OptimizationRequest,
        cancel: &CancelToken,
    ) -> Result<RunResult, RunError> {
        let started = Instant::now();
        if request.start_date > request.end_date {
            return Err(RunError::InvalidInput(format!(
                "start date {} is after end date {}",
                request.start_date, request.end_date
            )));
        }
        if request.service_id.is_empty() {
            return Err(RunError::InvalidInput("service id is empty".to_string()));
        }
        let range = DateRange::new(request.start_date, request.end_date);
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(crate::generate_id);
        debug!(
            request_id = %request_id,
            service = %request.service_id,
            goals = ?request.goals,
            mode = ?request.mode,
            "optimization run started"
        );

        let mut timings = StageTimings::default();
        let mut degraded_stages: Vec<String> = Vec::new();
        let mut algorithms_used: Vec<String> = Vec::new();

        // Step 1: load the current schedule and forecast in parallel.
        // Loader failure degrades to empty inputs and shows up in the run's
        // data quality, never as an error.
        let (schedule_res, forecast_res) = rayon::join(
            || self.loader.load_schedule(&range, &request.service_id),
            || self.loader.load_forecast(&range, &request.service_id),
        );
        let schedule: Vec<ShiftBlock> = schedule_res.unwrap_or_else(|e| {
            warn!("schedule load failed: {e}");
            Vec::new()
        });
        let forecast: BTreeMap<Slot, u32> = forecast_res.unwrap_or_else(|e| {
            warn!("forecast load failed: {e}");
            BTreeMap::new()
        });
        self.check_cancel(cancel)?;

        // Step 2: gap analysis.
        let clock = StageClock::start(GAP_BUDGET);
        let scheduled_map = scheduled_headcount(&forecast, &schedule);
        let gap_report = GapAnalyzer::new()
            .with_hourly_cost(self.config.gap_hourly_cost)
            .analyze(&forecast, &scheduled_map);
        timings.gap_ms = clock.elapsed_ms();
        algorithms_used.push("gap_analysis".to_string());
        if clock.over_budget() {
            degraded_stages.push("gap_analysis".to_string());
        }
        debug!(
            total_gaps = gap_report.total_gaps,
            coverage_score = gap_report.coverage_score,
            "gap analysis complete"
        );
        self.check_cancel(cancel)?;

        // Run-scoped caches: rules, profiles, payroll, and history are
        // loaded once here and shared read-only by the fan-out.
        let validator = ConstraintValidator::from_store(self.store.as_ref());
        let cost = CostCalculator::from_store(self.store.as_ref());
        let scoring = ScoringEngine::from_store(self.store.as_ref());
        let pool: Vec<Employee> = self.store.employee_profiles(None).unwrap_or_default();
        let available_skills: BTreeSet<Id> =
            pool.iter().flat_map(|e| e.skills.iter().cloned()).collect();
        let has_preference_data = self
            .store
            .employee_preferences()
            .map(|p| !p.is_empty())
            .unwrap_or(false);

        // Step 3: evolutionary variant generation.
        let clock = StageClock::start(GENERATOR_BUDGET);
        let generated = self.generator.generate(
            &schedule,
            &gap_report,
            &request.constraints,
            &request.targets,
            self.config.seed,
        );
        timings.generator_ms = clock.elapsed_ms();
        algorithms_used.push("pattern_generation".to_string());
        if generated.degraded || clock.over_budget() {
            degraded_stages.push("pattern_generation".to_string());
        }
        self.check_cancel(cancel)?;

        // Baseline: the current schedule validated and costed as-is.
        let current = ScheduleVariant::new("CURRENT", PatternType::Traditional, schedule.clone());
        let current_compliance = validator.validate(&current, None);
        let current_cost = cost.calculate(&current);
        let baseline = ScoringBaseline {
            total_gaps: gap_report.total_gaps,
            current_weekly_cost: current_cost.total_weekly_cost,
            current_overtime_cost: current_cost.component_total(CostComponent::Overtime),
        };

        if started.elapsed() > self.config.run_deadline {
            return Ok(self.assemble(
                request,
                request_id,
                RankedSuggestions::default(),
                &gap_report,
                &current_compliance,
                &current_cost,
                &schedule,
                &forecast,
                generated.variants.len(),
                timings,
                degraded_stages,
                algorithms_used,
                started,
                RunStatus::Timeout,
            ));
        }

        // Step 4: validate and cost every variant on the worker pool.
        let clock = StageClock::start(VALIDATOR_BUDGET);
        let compliances: Vec<Option<ComplianceMatrix>> = generated
            .variants
            .par_iter()
            .map(|v| (!cancel.is_cancelled()).then(|| validator.validate(v, None)))
            .collect();
        timings.validation_ms = clock.elapsed_ms();
        algorithms_used.push("constraint_validation".to_string());
        if clock.over_budget() {
            degraded_stages.push("constraint_validation".to_string());
        }
        self.check_cancel(cancel)?;

        let clock = StageClock::start(COST_BUDGET);
        let financials: Vec<Option<FinancialImpact>> = generated
            .variants
            .par_iter()
            .map(|v| (!cancel.is_cancelled()).then(|| cost.calculate(v)))
            .collect();
        timings.cost_ms = clock.elapsed_ms();
        algorithms_used.push("cost_calculation".to_string());
        if clock.over_budget() {
            degraded_stages.push("cost_calculation".to_string());
        }
        self.check_cancel(cancel)?;

        let evaluations: Vec<VariantEvaluation> = generated
            .variants
            .iter()
            .zip(compliances)
            .zip(financials)
            .filter_map(|((variant, compliance), financial)| {
                Some(VariantEvaluation {
                    variant: variant.clone(),
                    compliance: compliance?,
                    financial: financial?,
                    available_skills: available_skills.clone(),
                    has_preference_data,
                })
            })
            .collect();

        // Step 5: scoring and ranking.
        let clock = StageClock::start(SCORING_BUDGET);
        let ranked = scoring.score(&evaluations, &gap_report, &baseline, &request.targets);
        timings.scoring_ms = clock.elapsed_ms();
        algorithms_used.push("multi_criteria_scoring".to_string());
        if clock.over_budget() {
            degraded_stages.push("multi_criteria_scoring".to_string());
        }

        let status = if started.elapsed() > self.config.run_deadline {
            RunStatus::Timeout
        } else if !degraded_stages.is_empty() {
            RunStatus::Degraded
        } else {
            RunStatus::Ok
        };

        Ok(self.assemble(
            request,
            request_id,
            ranked,
            &gap_report,
            &current_compliance,
            &current_cost,
            &schedule,
            &forecast,
            evaluations.len(),
            timings,
            degraded_stages,
            algorithms_used,
            started,
            status,
        ))
    }

    /// Applies multiple compatible suggestions simultaneously: conflict
    /// detection, resource and budget checks, combined impact, risk, and a
    /// rollback plan.
    pub fn bulk_apply(
        &self,
        variants: &[ScheduleVariant],
        constraints: &BulkConstraints,
        mode: OptimizationMode,
    ) -> BulkOperationResult {
        bulk::bulk_apply(variants, constraints, mode)
    }

    fn check_cancel(&self, cancel: &CancelToken) -> Result<(), RunError> {
        if cancel.is_cancelled() {
            Err(RunError::Cancelled)
        } else {
            Ok(())
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        request: &OptimizationRequest,
        request_id: Id,
        suggestions: RankedSuggestions,
        gap_report: &GapReport,
        current_compliance: &ComplianceMatrix,
        current_cost: &FinancialImpact,
        schedule: &[ShiftBlock],
        forecast: &BTreeMap<Slot, u32>,
        variants_analyzed: usize,
        stage_timings: StageTimings,
        degraded_stages: Vec<String>,
        algorithms_used: Vec<String>,
        started: Instant,
        status: RunStatus,
    ) -> RunResult {
        let slow = started.elapsed() > self.config.slow_alert;
        if slow {
            warn!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "optimization run exceeded the alerting threshold"
            );
        }

        RunResult {
            request_id,
            analysis_metadata: AnalysisMetadata {
                variants_analyzed,
                total_gaps: gap_report.total_gaps,
                gap_coverage_score: gap_report.coverage_score,
                current_weekly_cost: current_cost.total_weekly_cost,
                stage_timings,
                degraded_stages,
                slow,
            },
            validation_results: ValidationResults {
                compliance_score: current_compliance.compliance_score,
                total_violations: current_compliance.total_violations,
                critical_issues: current_compliance.validation_summary.critical_issues,
                validation_passed: current_compliance.compliance_score >= 80.0,
                source: current_compliance.source,
            },
            implementation_plan: plan::build(request.mode),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            algorithms_used,
            data_quality: data_quality(schedule, forecast),
            recommendation_confidence: recommendation_confidence(
                gap_report.coverage_score,
                current_compliance.compliance_score,
            ),
            status,
            suggestions,
        }
    }
}

/// Scheduled headcount per forecast interval, from the loaded blocks.
fn scheduled_headcount(
    forecast: &BTreeMap<Slot, u32>,
    schedule: &[ShiftBlock],
) -> BTreeMap<Slot, u32> {
    forecast
        .keys()
        .map(|&slot| {
            let staffed = schedule.iter().filter(|b| b.covers_slot(&slot)).count() as u32;
            (slot, staffed)
        })
        .collect()
}

/// Input completeness: 85 base, minus schedule and forecast penalties.
fn data_quality(schedule: &[ShiftBlock], forecast: &BTreeMap<Slot, u32>) -> f64 {
    let mut quality: f64 = 85.0;
    if schedule.len() < 5 {
        quality -= 10.0;
    }
    let forecast_hours: BTreeSet<u8> = forecast.keys().map(Slot::hour).collect();
    if forecast_hours.len() < 24 {
        quality -= 15.0;
    }
    quality.clamp(0.0, 100.0)
}

/// Base 85, adjusted by gap coverage and compliance; clamped to `[80, 100]`.
fn recommendation_confidence(gap_coverage: f64, compliance: f64) -> f64 {
    let mut confidence: f64 = 85.0;
    if gap_coverage > 90.0 {
        confidence += 10.0;
    } else if gap_coverage < 70.0 {
        confidence -= 10.0;
    }
    if compliance < 80.0 {
        confidence -= 10.0;
    }
    confidence.clamp(80.0, 100.0)
}
