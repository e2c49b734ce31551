//! Pattern generation: an evolutionary search over schedule variants.

mod evolution;
mod fitness;
mod seeding;

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gap::GapReport;
use crate::model::{OptimizationTargets, ScheduleVariant, ShiftBlock};

/// Hard limits the search treats as fitness penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConstraints {
    /// No shift may run longer than this many hours.
    pub max_shift_hours: f64,
    /// Weekly coverage floor per employee (half the 40-hour norm).
    pub min_weekly_hours: f64,
    pub earliest_start_hour: u8,
    pub latest_end_hour: u8,
}

impl Default for GeneratorConstraints {
    fn default() -> Self {
        Self {
            max_shift_hours: 12.0,
            min_weekly_hours: 20.0,
            earliest_start_hour: 6,
            latest_end_hour: 22,
        }
    }
}

/// Evolutionary search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub population_size: usize,
    pub max_generations: u32,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_size: usize,
    pub tournament_size: usize,
    /// Generations inspected for the convergence check.
    pub convergence_window: usize,
    /// Minimum best-fitness gain over the window to keep evolving.
    pub convergence_epsilon: f64,
    /// At most this many variants are presented.
    pub max_output: usize,
    /// Stage budget; exceeding it degrades to the current elite set.
    pub budget: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 20,
            mutation_rate: 0.10,
            crossover_rate: 0.80,
            elite_size: 5,
            tournament_size: 3,
            convergence_window: 5,
            convergence_epsilon: 1.0,
            max_output: 5,
            budget: Duration::from_secs(8),
        }
    }
}

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorResult {
    pub variants: Vec<ScheduleVariant>,
    pub generations_run: u32,
    pub converged: bool,
    /// Budget was exceeded and the elite set was returned early.
    pub degraded: bool,
    pub best_fitness: f64,
}

/// Source of candidate variants, pluggable so the orchestrator can be
/// exercised with scripted generators.
pub trait VariantSource: Send + Sync {
    fn generate(
        &self,
        current: &[ShiftBlock],
        gaps: &GapReport,
        constraints: &GeneratorConstraints,
        targets: &OptimizationTargets,
        seed: u64,
    ) -> GeneratorResult;
}

/// Genetic-algorithm pattern generator.
///
/// # Contract
///
/// Deterministic: the pseudorandom source is an explicit parameter, and a
/// fixed seed with identical inputs reproduces the output bit for bit (as
/// long as the budget does not fire mid-run). Completes within its budget or
/// returns the current elite set flagged `degraded`.
#[derive(Debug, Clone, Default)]
pub struct PatternGenerator {
    config: GeneratorConfig,
}

impl PatternGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs the full search with a caller-supplied RNG.
    pub fn generate_with_rng<R: Rng>(
        &self,
        current: &[ShiftBlock],
        gaps: &GapReport,
        constraints: &GeneratorConstraints,
        targets: &OptimizationTargets,
        rng: &mut R,
    ) -> GeneratorResult {
        let deadline = Instant::now() + self.config.budget;
        let mut next_id: u32 = 0;

        let population: Vec<ScheduleVariant> = seeding::PATTERN_COUNTS
            .iter()
            .flat_map(|&(pattern, count)| {
                (0..count).map(move |index| (pattern, index))
            })
            .map(|(pattern, index)| {
                let blocks = seeding::seed_blocks(pattern, index, current, gaps, constraints);
                let id = format!("VAR_{:03}", next_id);
                next_id += 1;
                ScheduleVariant::new(id, pattern, blocks)
            })
            .collect();

        debug!(
            population = population.len(),
            "seeded initial variant population"
        );

        let outcome = evolution::evolve(
            population,
            gaps,
            constraints,
            targets,
            &self.config,
            deadline,
            &mut next_id,
            rng,
        );

        if outcome.degraded {
            warn!(
                generations_run = outcome.generations_run,
                "generator budget exceeded, returning elite set"
            );
        }

        let best_fitness = outcome
            .population
            .first()
            .map(|v| v.metrics.fitness)
            .unwrap_or(0.0);
        let variants = evolution::select_final(&outcome.population, self.config.max_output);

        GeneratorResult {
            variants,
            generations_run: outcome.generations_run,
            converged: outcome.converged,
            degraded: outcome.degraded,
            best_fitness,
        }
    }
}

impl VariantSource for PatternGenerator {
    fn generate(
        &self,
        current: &[ShiftBlock],
        gaps: &GapReport,
        constraints: &GeneratorConstraints,
        targets: &OptimizationTargets,
        seed: u64,
    ) -> GeneratorResult {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate_with_rng(current, gaps, constraints, targets, &mut rng)
    }
}
