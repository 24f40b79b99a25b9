//! Sequential execution of a sweep plan.
//!
//! Cells run one at a time in plan order: weapon, refine, variant, then
//! main-stat combo. Each weapon's results are collected in a private buffer
//! and committed only once every cell of that weapon has finished, so a
//! canceled sweep never leaves a weapon half-populated.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::RosterResult;
use crate::mainstats::MainStatCombos;
use crate::planner::{plan_cell_count, WeaponPlan};
use crate::result::{CellResult, ResultKey, ResultTable};
use crate::runner::{CancelToken, CellRunner, SearchCell};
use crate::target::Target;
use crate::variant::VariantSet;

/// Observes the completed-cell counter. Reporting only.
pub trait ProgressSink {
    fn on_cell(&mut self, completed: usize, total: usize);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_cell(&mut self, _completed: usize, _total: usize) {}
}

/// Logs progress with a linear ETA.
#[derive(Debug, Clone)]
pub struct LogProgress {
    started: Instant,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl LogProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Remaining time assuming every cell costs the running average.
#[must_use]
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 || completed > total {
        return None;
    }
    let per_cell = elapsed.as_secs_f64() / completed as f64;
    Some(Duration::from_secs_f64(per_cell * (total - completed) as f64))
}

impl ProgressSink for LogProgress {
    fn on_cell(&mut self, completed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = completed as f64 / total as f64 * 100.0;
        let eta = estimate_remaining(self.started.elapsed(), completed, total)
            .map_or_else(|| "unknown".to_string(), |d| format!("{}s", d.as_secs()));
        info!(completed, total, percent = format!("{percent:.1}%"), eta = %eta, "progress");
    }
}

/// What a sweep produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Results of fully completed weapons only.
    pub results: ResultTable,
    /// The sweep stopped early on request.
    pub canceled: bool,
    pub completed_cells: usize,
    pub total_cells: usize,
    /// Wall time spent inside the runner.
    pub sim_elapsed: Duration,
}

/// Runs every cell of `plan`.
///
/// Cancellation, whether observed on the token before a cell or reported by
/// the runner, discards the current weapon and returns with `canceled` set.
/// Any other runner error aborts the sweep.
pub fn execute<R>(
    plan: &[WeaponPlan],
    variants: &VariantSet,
    combos: &MainStatCombos,
    target: Target,
    runner: &mut R,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> RosterResult<RunOutcome>
where
    R: CellRunner + ?Sized,
{
    let mut outcome = RunOutcome {
        results: ResultTable::new(variants.names()),
        total_cells: plan_cell_count(plan, combos.len(), variants.len()),
        ..RunOutcome::default()
    };

    'weapons: for weapon_plan in plan {
        let mut buffer = ResultTable::new(variants.names());

        for &refine in &weapon_plan.refines {
            for variant in variants.iter() {
                let mut best: Option<CellResult> = None;

                for main_stats in combos.labels() {
                    if cancel.is_canceled() {
                        outcome.canceled = true;
                        break 'weapons;
                    }
                    let cell = SearchCell {
                        weapon: &weapon_plan.weapon,
                        refine,
                        variant,
                        main_stats,
                    };

                    let started = Instant::now();
                    let sim = match runner.run_cell(&cell, cancel) {
                        Ok(sim) => sim,
                        Err(e) if e.is_canceled() => {
                            outcome.canceled = true;
                            break 'weapons;
                        }
                        Err(e) => return Err(e),
                    };
                    outcome.sim_elapsed += started.elapsed();
                    outcome.completed_cells += 1;
                    progress.on_cell(outcome.completed_cells, outcome.total_cells);

                    let candidate = CellResult {
                        team_metric: sim.team_metric,
                        char_metric: sim.char_metric,
                        energy_recharge: sim.energy_recharge,
                        main_stats: main_stats.clone(),
                        config: sim.config_text,
                    };
                    if best.as_ref().map_or(true, |b| target.is_better(&candidate, b)) {
                        best = Some(candidate);
                    }
                }

                if let Some(best) = best {
                    buffer.insert(&variant.name, ResultKey::new(weapon_plan.weapon.as_str(), refine), best);
                }
            }
        }

        debug!(weapon = %weapon_plan.weapon, rows = buffer.len(), "weapon committed");
        outcome.results.absorb(buffer);
    }

    if outcome.canceled {
        info!(
            completed = outcome.completed_cells,
            total = outcome.total_cells,
            "sweep interrupted, keeping fully computed weapons"
        );
    }
    Ok(outcome)
}
