//! End-to-end sweep.
//!
//! [`run`] wires the production pieces together (roster config, engine
//! catalogs, acquisition sources, text config editor, CLI runner) and hands
//! off to [`execute_sweep`], which only needs a [`CellRunner`] and is what
//! the integration tests drive.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{info, warn};

use crate::catalog::{EngineData, WeaponCatalog, WeaponNames};
use crate::config_edit::{find_char_index, parse_char_order, TextConfigEditor};
use crate::eligibility::SourcePolicy;
use crate::error::{ConfigError, RosterError, RosterResult};
use crate::mainstats::MainStatCombos;
use crate::merge::{merge, Precedence};
use crate::planner::{build_plan, plan_cell_count, PlanContext};
use crate::result::ResultTable;
use crate::run_loop::{self, LogProgress, ProgressSink};
use crate::runner::{CancelToken, CellRunner, CliRunner, SimCellRunner};
use crate::selection::{
    resolve_requests, select_by_class_and_rarity, sort_by_rarity_desc_then_key, WeaponSelection,
};
use crate::settings::{resolve_table_paths, AppPaths, RosterConfig, TablePaths};
use crate::sources::{AcquisitionSources, SourceReadiness};
use crate::store::{fingerprint, load_table, save_table, ArtifactLock, ArtifactMeta, ExportContext};
use crate::target::Target;
use crate::variant::VariantSet;

/// Command-line overrides on top of the roster config.
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// App root; discovered from the working directory when unset.
    pub root: Option<PathBuf>,
    /// Roster config path; defaults to the one under the app root.
    pub config: Option<PathBuf>,
    pub use_examples: bool,
    pub skip_existing: bool,
    pub keep_better: bool,
    pub output: Option<PathBuf>,
    pub base: Option<PathBuf>,
}

/// Everything a sweep needs once the inputs are loaded.
#[derive(Debug, Clone)]
pub struct SweepJob {
    pub catalog: WeaponCatalog,
    pub names: WeaponNames,
    pub sources: AcquisitionSources,
    pub policy: SourcePolicy,
    pub selection: WeaponSelection,
    pub character: String,
    pub roster_name: String,
    pub target: Target,
    pub variants: VariantSet,
    pub combos: MainStatCombos,
    /// Simulation config text the cells are derived from.
    pub base_config: String,
    pub skip_existing: bool,
    pub precedence: Precedence,
    pub tables: TablePaths,
    /// Start of the whole invocation, for the timing summary.
    pub started: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepStatus {
    Completed,
    /// Stopped early; the table holds only fully computed weapons.
    Canceled,
    /// Some rarity-4 weapons have no acquisition sources yet. Nothing ran.
    SourcesNotReady(SourceReadiness),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    pub total: Duration,
    pub app: Duration,
    pub simulations: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub status: SweepStatus,
    /// Written table, if any.
    pub output: Option<PathBuf>,
    pub rows: usize,
    pub completed_cells: usize,
    pub timing: Timing,
}

/// Loads the base table (if any), plans, runs, merges and saves.
///
/// The output directory stays locked from before the base is read until the
/// merged table is on disk.
pub fn execute_sweep<R>(
    job: &SweepJob,
    runner: &mut R,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> RosterResult<SweepReport>
where
    R: CellRunner + ?Sized,
{
    let output_dir = job
        .tables
        .output
        .parent()
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    let _lock = ArtifactLock::acquire(&output_dir)?;

    let base = match &job.tables.base {
        Some(path) => {
            let imported = load_table(path, &job.catalog, &job.names)?;
            if let Some(meta) = &imported.meta {
                if meta.config_fingerprint != fingerprint(&job.base_config) {
                    warn!(
                        base = %path.display(),
                        "base table was produced from a different config; its results may be stale"
                    );
                }
            }
            info!(base = %path.display(), rows = imported.table.len(), "loaded base table");
            Some(imported.table)
        }
        None => None,
    };

    let variant_order = job.variants.names();
    let plan = build_plan(
        &PlanContext {
            catalog: &job.catalog,
            sources: &job.sources,
            policy: &job.policy,
            selection: &job.selection,
        },
        &variant_order,
        base.as_ref(),
        job.skip_existing,
    )?;
    info!(
        weapons = plan.len(),
        cells = plan_cell_count(&plan, job.combos.len(), job.variants.len()),
        combos = job.combos.len(),
        variants = job.variants.len(),
        "sweep planned"
    );

    let outcome = run_loop::execute(
        &plan,
        &job.variants,
        &job.combos,
        job.target,
        runner,
        cancel,
        progress,
    )?;
    if outcome.canceled {
        warn!("interrupted: exporting only fully computed weapons");
    }

    let table: ResultTable = match &base {
        Some(base) => merge(base, &outcome.results, job.precedence),
        None => outcome.results,
    };

    let meta = ArtifactMeta::new(&job.character, &job.roster_name, job.target.as_str(), &job.base_config);
    save_table(
        &job.tables.output,
        &table,
        &ExportContext {
            catalog: &job.catalog,
            names: &job.names,
            sources: &job.sources,
            policy: &job.policy,
            target: job.target,
        },
        &meta,
    )?;
    info!(path = %job.tables.output.display(), rows = table.len(), "exported results");

    let total = job.started.elapsed();
    let timing = Timing {
        total,
        app: total.saturating_sub(outcome.sim_elapsed),
        simulations: outcome.sim_elapsed,
    };
    info!(
        total_s = timing.total.as_secs(),
        app_s = timing.app.as_secs(),
        simulations_s = timing.simulations.as_secs(),
        "timing"
    );

    Ok(SweepReport {
        status: if outcome.canceled {
            SweepStatus::Canceled
        } else {
            SweepStatus::Completed
        },
        output: Some(job.tables.output.clone()),
        rows: table.len(),
        completed_cells: outcome.completed_cells,
        timing,
    })
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Runs a full sweep against the engine CLI.
pub fn run(options: &SweepOptions, cancel: &CancelToken) -> RosterResult<SweepReport> {
    let started = Instant::now();

    let paths = match &options.root {
        Some(root) => AppPaths::new(root, options.use_examples),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| RosterError::internal(format!("working directory: {e}")))?;
            AppPaths::discover(&cwd, options.use_examples)?
        }
    };
    let config_path = options.config.clone().unwrap_or_else(|| paths.roster_config());
    let mut config = RosterConfig::load(&config_path)?;
    config.skip_existing_results |= options.skip_existing;
    config.keep_better_results |= options.keep_better;
    if let Some(output) = &options.output {
        config.output_table_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(base) = &options.base {
        config.base_table_path = Some(base.to_string_lossy().into_owned());
    }

    let base_config = read_text(&paths.base_config())?;
    let target = config.target()?;
    let variants = config.variants()?;
    let combos = config.combos()?;
    let policy = config.source_policy();

    let engine_root = paths.engine_root(&config)?;
    let data = EngineData::load(&engine_root)?;
    let sources_path = paths.sources();
    let mut sources = AcquisitionSources::load_validated(&sources_path, &policy)?;

    let char_index = find_char_index(&parse_char_order(&base_config), &config.character).ok_or_else(|| {
        ConfigError::CharacterNotInConfig {
            character: config.character.clone(),
        }
    })?;
    let weapon_class = data
        .characters
        .get(&config.character)
        .map(|c| c.weapon_class.clone())
        .ok_or_else(|| ConfigError::CharacterNotInCatalog {
            character: config.character.clone(),
        })?;
    info!(character = %config.character, index = char_index, class = %weapon_class, "optimizing character");

    let (included, excluded) =
        select_by_class_and_rarity(&data.weapons, &weapon_class, config.minimum_weapon_rarity);
    info!(
        minimum_rarity = config.minimum_weapon_rarity,
        included = included.len(),
        excluded = excluded.len(),
        "weapon candidates"
    );

    let readiness = sources.ensure_ready(&included, &data.weapons, &sources_path)?;
    if !readiness.is_ready() {
        warn!(
            path = %sources_path.display(),
            missing = ?readiness.missing,
            empty = ?readiness.empty,
            "fill in acquisition sources for these rarity-4 weapons, then run again"
        );
        return Ok(SweepReport {
            status: SweepStatus::SourcesNotReady(readiness),
            output: None,
            rows: 0,
            completed_cells: 0,
            timing: Timing::default(),
        });
    }

    let selection = if config.weapons.is_empty() {
        WeaponSelection::all(sort_by_rarity_desc_then_key(&included, &data.weapons))
    } else {
        let selection = resolve_requests(
            &config.weapons,
            &data.weapons,
            &data.names,
            &config.character,
            &weapon_class,
        )?;
        info!(weapons = selection.weapons.len(), "running selected weapons");
        selection
    };

    let tables = resolve_table_paths(&paths, &config, Local::now().date_naive())?;
    let editor = TextConfigEditor::new(&config.character)?;
    let cli = CliRunner::new(&engine_root, paths.work_dir(), char_index)?;
    let mut runner = SimCellRunner::new(base_config.clone(), editor, cli);

    let job = SweepJob {
        catalog: data.weapons,
        names: data.names,
        sources,
        policy,
        selection,
        precedence: config.precedence(target),
        character: config.character,
        roster_name: config.roster_name,
        target,
        variants,
        combos,
        base_config,
        skip_existing: config.skip_existing_results,
        tables,
        started,
    };
    execute_sweep(&job, &mut runner, cancel, &mut LogProgress::new())
}
