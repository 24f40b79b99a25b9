//! Simulation runners.
//!
//! Two seams:
//! - [`SimulationRunner`] maps a config text plus optimizer options to
//!   engine statistics (an external process in production)
//! - [`CellRunner`] maps a grid cell to the same statistics, so the run loop
//!   never sees config text at all
//!
//! Cancellation is cooperative through [`CancelToken`] and always surfaces
//! as [`RunnerError::Canceled`], never as a failure.

pub mod cli;
pub mod payload;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use cli::CliRunner;
pub use payload::EnginePayload;

use crate::config_edit::{CellEdit, ConfigEditor};
use crate::error::{RosterResult, RunnerError};
use crate::variant::SubstatVariant;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Engine statistics for one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOutcome {
    /// Truncated mean team throughput.
    pub team_metric: i64,
    /// Truncated mean throughput of the optimized character.
    pub char_metric: i64,
    /// Energy recharge snapshot of the optimized character.
    pub energy_recharge: f64,
    /// Config text the engine reports having run.
    pub config_text: String,
}

/// Runs one simulation. Blocking; must return `RunnerError::Canceled` when
/// interrupted through `cancel` or by the operator.
pub trait SimulationRunner {
    fn run(&mut self, cancel: &CancelToken, config_text: &str, options: &str) -> Result<SimOutcome, RunnerError>;
}

/// The atomic unit of the sweep.
#[derive(Debug, Clone, Copy)]
pub struct SearchCell<'a> {
    pub weapon: &'a str,
    pub refine: u8,
    pub variant: &'a SubstatVariant,
    pub main_stats: &'a str,
}

/// Evaluates grid cells.
pub trait CellRunner {
    fn run_cell(&mut self, cell: &SearchCell<'_>, cancel: &CancelToken) -> RosterResult<SimOutcome>;
}

/// Edits the base config for each cell and hands it to a [`SimulationRunner`].
#[derive(Debug)]
pub struct SimCellRunner<E, R> {
    base_config: String,
    editor: E,
    runner: R,
}

impl<E: ConfigEditor, R: SimulationRunner> SimCellRunner<E, R> {
    pub fn new(base_config: impl Into<String>, editor: E, runner: R) -> Self {
        Self {
            base_config: base_config.into(),
            editor,
            runner,
        }
    }
}

impl<E: ConfigEditor, R: SimulationRunner> CellRunner for SimCellRunner<E, R> {
    fn run_cell(&mut self, cell: &SearchCell<'_>, cancel: &CancelToken) -> RosterResult<SimOutcome> {
        let config = self.editor.edit(
            &self.base_config,
            &CellEdit {
                weapon: cell.weapon,
                refine: cell.refine,
                main_stats: cell.main_stats,
                talent_level: cell.variant.talent_level,
            },
        )?;
        let options = cell.variant.options.to_option_string();
        Ok(self.runner.run(cancel, &config, &options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_edit::TextConfigEditor;

    struct Echo {
        seen: Vec<(String, String)>,
    }

    impl SimulationRunner for Echo {
        fn run(&mut self, cancel: &CancelToken, config_text: &str, options: &str) -> Result<SimOutcome, RunnerError> {
            if cancel.is_canceled() {
                return Err(RunnerError::Canceled);
            }
            self.seen.push((config_text.to_string(), options.to_string()));
            Ok(SimOutcome {
                team_metric: 10,
                char_metric: 5,
                energy_recharge: 1.0,
                config_text: config_text.to_string(),
            })
        }
    }

    const BASE: &str = "xl char lvl=90/90;\nxl add weapon=\"a\" refine=1;\nxl add stats hp=4780 atk=311 a b c;";

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_canceled());
        clone.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn test_sim_cell_runner_edits_config() {
        let editor = TextConfigEditor::new("xl").unwrap();
        let mut runner = SimCellRunner::new(BASE, editor, Echo { seen: Vec::new() });
        let mut variant = SubstatVariant::default_variant();
        variant.talent_level = Some(9);
        let cell = SearchCell {
            weapon: "b",
            refine: 5,
            variant: &variant,
            main_stats: "er pyro% cr",
        };
        let outcome = runner.run_cell(&cell, &CancelToken::new()).unwrap();
        assert!(outcome.config_text.contains("weapon=\"b\" refine=5"));
        assert!(outcome.config_text.contains("hp=4780 atk=311 er pyro% cr;"));
        assert!(outcome.config_text.contains("talent=9,9,9"));
        assert_eq!(runner.runner.seen[0].1, "");
    }

    #[test]
    fn test_sim_cell_runner_propagates_errors() {
        let editor = TextConfigEditor::new("other").unwrap();
        let mut runner = SimCellRunner::new(BASE, editor, Echo { seen: Vec::new() });
        let variant = SubstatVariant::default_variant();
        let cell = SearchCell {
            weapon: "b",
            refine: 5,
            variant: &variant,
            main_stats: "er pyro% cr",
        };
        let err = runner.run_cell(&cell, &CancelToken::new()).unwrap_err();
        assert!(err.is_data());

        let editor = TextConfigEditor::new("xl").unwrap();
        let mut runner = SimCellRunner::new(BASE, editor, Echo { seen: Vec::new() });
        let token = CancelToken::new();
        token.cancel();
        let err = runner.run_cell(&cell, &token).unwrap_err();
        assert!(err.is_canceled());
    }
}
