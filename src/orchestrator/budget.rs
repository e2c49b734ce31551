//! Per-stage latency budgets and the clocks that enforce them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const GAP_BUDGET: Duration = Duration::from_secs(3);
pub const GENERATOR_BUDGET: Duration = Duration::from_secs(8);
pub const VALIDATOR_BUDGET: Duration = Duration::from_secs(2);
pub const COST_BUDGET: Duration = Duration::from_secs(2);
pub const SCORING_BUDGET: Duration = Duration::from_secs(2);

/// Hard wall-clock deadline for one run.
pub const RUN_DEADLINE: Duration = Duration::from_secs(60);
/// Non-fatal alerting threshold; runs past this are marked slow.
pub const SLOW_RUN_ALERT: Duration = Duration::from_secs(30);

/// Wall-clock timer for one stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageClock {
    started: Instant,
    budget: Duration,
}

impl StageClock {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// A stage that ran past its budget returns partial results flagged
    /// degraded; past twice the budget is a contract breach upstream.
    pub fn over_budget(&self) -> bool {
        self.started.elapsed() > self.budget
    }
}

/// Observed per-stage wall-clock times for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub gap_ms: f64,
    pub generator_ms: f64,
    pub validation_ms: f64,
    pub cost_ms: f64,
    pub scoring_ms: f64,
}

/// Cooperative cancellation handle. Cancelling a run cancels all of its
/// outstanding parallel evaluations at their next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
