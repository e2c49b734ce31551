//! Evolutionary loop: selection, crossover, mutation, elitism.

use std::collections::BTreeSet;
use std::time::Instant;

use rand::seq::index::sample;
use rand::Rng;

use super::fitness;
use super::{GeneratorConfig, GeneratorConstraints};
use crate::gap::GapReport;
use crate::model::{OptimizationTargets, ScheduleVariant, ShiftBlock, ShiftPart};

pub(crate) struct EvolutionOutcome {
    pub population: Vec<ScheduleVariant>,
    pub generations_run: u32,
    pub converged: bool,
    pub degraded: bool,
}

/// Runs the generational loop over an already seeded population.
///
/// The deadline is only checked between generations, so a fixed RNG seed
/// yields identical populations whenever the deadline does not fire.
pub(crate) fn evolve<R: Rng>(
    mut population: Vec<ScheduleVariant>,
    gaps: &GapReport,
    constraints: &GeneratorConstraints,
    targets: &OptimizationTargets,
    config: &GeneratorConfig,
    deadline: Instant,
    next_id: &mut u32,
    rng: &mut R,
) -> EvolutionOutcome {
    let mut best_history: Vec<f64> = Vec::with_capacity(config.max_generations as usize);
    let mut converged = false;
    let mut degraded = false;
    let mut generations_run = 0;

    for _ in 0..config.max_generations {
        evaluate_all(&mut population, gaps, constraints, targets);
        sort_population(&mut population);
        best_history.push(population[0].metrics.fitness);
        generations_run += 1;

        if has_converged(&best_history, config) {
            converged = true;
            break;
        }
        if Instant::now() >= deadline {
            // Out of budget: the current elite set is the best we have.
            degraded = true;
            break;
        }

        population = next_generation(population, constraints, config, next_id, rng);
    }

    // Offspring of the last generation may be unevaluated when the loop ran
    // to the generation limit.
    evaluate_all(&mut population, gaps, constraints, targets);
    sort_population(&mut population);

    EvolutionOutcome {
        population,
        generations_run,
        converged,
        degraded,
    }
}

fn evaluate_all(
    population: &mut [ScheduleVariant],
    gaps: &GapReport,
    constraints: &GeneratorConstraints,
    targets: &OptimizationTargets,
) {
    for variant in population.iter_mut() {
        fitness::evaluate(variant, gaps, constraints, targets);
    }
}

/// Total, deterministic order: fitness descending, variant id ascending.
pub(crate) fn sort_population(population: &mut [ScheduleVariant]) {
    population.sort_by(|a, b| {
        b.metrics
            .fitness
            .total_cmp(&a.metrics.fitness)
            .then_with(|| a.variant_id.cmp(&b.variant_id))
    });
}

/// Best-fitness gain over the sliding window fell under the epsilon.
fn has_converged(best_history: &[f64], config: &GeneratorConfig) -> bool {
    let window = config.convergence_window;
    if best_history.len() < window {
        return false;
    }
    let recent = &best_history[best_history.len() - window..];
    recent[window - 1] - recent[0] < config.convergence_epsilon
}

fn next_generation<R: Rng>(
    population: Vec<ScheduleVariant>,
    constraints: &GeneratorConstraints,
    config: &GeneratorConfig,
    next_id: &mut u32,
    rng: &mut R,
) -> Vec<ScheduleVariant> {
    let mut next: Vec<ScheduleVariant> = population[..config.elite_size.min(population.len())].to_vec();

    while next.len() < config.population_size {
        let parent1 = tournament(&population, config, rng);
        let parent2 = tournament(&population, config, rng);

        let (mut child1, mut child2) = if rng.gen::<f64>() < config.crossover_rate {
            crossover(parent1, parent2)
        } else {
            (parent1.blocks.clone(), parent2.blocks.clone())
        };

        if rng.gen::<f64>() < config.mutation_rate {
            mutate(&mut child1, constraints, rng);
        }
        if rng.gen::<f64>() < config.mutation_rate {
            mutate(&mut child2, constraints, rng);
        }

        for (parent, blocks) in [(parent1, child1), (parent2, child2)] {
            let mut child = ScheduleVariant::new(fresh_id(next_id), parent.pattern_type, blocks);
            child.generation = parent.generation + 1;
            next.push(child);
        }
    }

    next.truncate(config.population_size);
    next
}

fn fresh_id(next_id: &mut u32) -> String {
    let id = format!("VAR_{:03}", *next_id);
    *next_id += 1;
    id
}

/// Size-k tournament: best fitness among k sampled variants.
fn tournament<'a, R: Rng>(
    population: &'a [ScheduleVariant],
    config: &GeneratorConfig,
    rng: &mut R,
) -> &'a ScheduleVariant {
    let k = config.tournament_size.min(population.len());
    sample(rng, population.len(), k)
        .iter()
        .map(|i| &population[i])
        .max_by(|a, b| {
            a.metrics
                .fitness
                .total_cmp(&b.metrics.fitness)
                .then_with(|| b.variant_id.cmp(&a.variant_id))
        })
        .expect("tournament over non-empty population")
}

/// Single-point block-list exchange.
fn crossover(
    parent1: &ScheduleVariant,
    parent2: &ScheduleVariant,
) -> (Vec<ShiftBlock>, Vec<ShiftBlock>) {
    if parent1.blocks.len() <= 2 || parent2.blocks.len() <= 2 {
        return (parent1.blocks.clone(), parent2.blocks.clone());
    }
    let point = parent1.blocks.len() / 2;
    let cut2 = point.min(parent2.blocks.len());

    let mut child1 = parent1.blocks[..point].to_vec();
    child1.extend_from_slice(&parent2.blocks[cut2..]);

    let mut child2 = parent2.blocks[..cut2].to_vec();
    child2.extend_from_slice(&parent1.blocks[point..]);

    (child1, child2)
}

/// Applies one randomly chosen mutation in place.
fn mutate<R: Rng>(blocks: &mut Vec<ShiftBlock>, constraints: &GeneratorConstraints, rng: &mut R) {
    if blocks.is_empty() {
        return;
    }
    match rng.gen_range(0..6u8) {
        0 => shift_time(blocks, constraints, rng),
        1 => add_hours(blocks, constraints, rng),
        2 => remove_hours(blocks, rng),
        3 => split_block(blocks, rng),
        4 => merge_parts(blocks),
        5 => swap_agents(blocks, rng),
        _ => unreachable!(),
    }
}

fn shift_time<R: Rng>(blocks: &mut [ShiftBlock], constraints: &GeneratorConstraints, rng: &mut R) {
    let block = &mut blocks[rng.gen_range(0..blocks.len())];
    let duration = block.duration_minutes();
    let delta: i32 = if rng.gen::<bool>() { 60 } else { -60 };
    let earliest = i32::from(constraints.earliest_start_hour) * 60;
    let latest_start = i32::from(constraints.latest_end_hour) * 60 - i32::from(duration);
    let start = (i32::from(block.start_min) + delta).clamp(earliest, latest_start.max(earliest));
    block.start_min = start as u16;
    block.end_min = block.start_min + duration;
}

fn add_hours<R: Rng>(blocks: &mut [ShiftBlock], constraints: &GeneratorConstraints, rng: &mut R) {
    let block = &mut blocks[rng.gen_range(0..blocks.len())];
    let cap = u16::from(constraints.latest_end_hour) * 60;
    block.end_min = (block.end_min + 60).min(cap.max(block.end_min));
}

fn remove_hours<R: Rng>(blocks: &mut [ShiftBlock], rng: &mut R) {
    let block = &mut blocks[rng.gen_range(0..blocks.len())];
    let floor = block.start_min + 4 * 60;
    block.end_min = block.end_min.saturating_sub(60).max(floor);
}

fn split_block<R: Rng>(blocks: &mut Vec<ShiftBlock>, rng: &mut R) {
    let idx = rng.gen_range(0..blocks.len());
    let block = blocks[idx].clone();
    let midpoint = block.start_min + block.duration_minutes() / 2;
    let second_end = midpoint + 120 + (block.end_min - midpoint);
    if second_end > 24 * 60 {
        return;
    }

    let mut first = block.clone();
    first.end_min = midpoint;
    first.shift_part = Some(ShiftPart::FirstHalf);

    let mut second = block;
    second.start_min = midpoint + 120;
    second.end_min = second_end;
    second.shift_part = Some(ShiftPart::SecondHalf);

    blocks[idx] = first;
    blocks.push(second);
}

/// Rejoins the first pair of split halves found for one employee and day.
fn merge_parts(blocks: &mut Vec<ShiftBlock>) {
    for i in 0..blocks.len() {
        if blocks[i].shift_part.is_none() {
            continue;
        }
        for j in i + 1..blocks.len() {
            if blocks[j].shift_part.is_some()
                && blocks[i].employee_id == blocks[j].employee_id
                && blocks[i].date == blocks[j].date
            {
                let start = blocks[i].start_min.min(blocks[j].start_min);
                let end = blocks[i].end_min.max(blocks[j].end_min);
                blocks[i].start_min = start;
                blocks[i].end_min = end;
                blocks[i].shift_part = None;
                blocks.remove(j);
                return;
            }
        }
    }
}

fn swap_agents<R: Rng>(blocks: &mut [ShiftBlock], rng: &mut R) {
    if blocks.len() < 2 {
        return;
    }
    let picks = sample(rng, blocks.len(), 2);
    let (a, b) = (picks.index(0), picks.index(1));
    let tmp = blocks[a].employee_id.clone();
    blocks[a].employee_id = blocks[b].employee_id.clone();
    blocks[b].employee_id = tmp;
}

/// Picks the presentation set: best fitness first, preferring unseen pattern
/// types once three variants are in.
pub(crate) fn select_final(population: &[ScheduleVariant], max: usize) -> Vec<ScheduleVariant> {
    let mut selected: Vec<ScheduleVariant> = Vec::new();
    let mut types_used = BTreeSet::new();

    for variant in population {
        if selected.len() >= max {
            break;
        }
        if !types_used.contains(&variant.pattern_type) || selected.len() < 3 {
            types_used.insert(variant.pattern_type);
            selected.push(variant.clone());
        }
    }
    selected
}
