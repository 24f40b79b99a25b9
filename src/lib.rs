//! # weapon-roster - Resumable weapon sweeps over an external combat simulator
//!
//! For one character, weapon-roster evaluates every eligible
//! (weapon, refine, optimizer variant, main-stat combo) cell with an external
//! simulator, keeps the best build per (weapon, refine, variant) and writes
//! the outcome to a result table. The same table is read back as the base of
//! the next sweep, so interrupted or extended runs only pay for what is new.
//!
//! ## Core Concepts
//!
//! - **Eligibility**: which refines a weapon is tested at, from its rarity and
//!   acquisition sources
//! - **Plan**: per-weapon refine lists, with weapons missing results first
//! - **Run loop**: sequential cell execution with whole-weapon commits
//! - **Result store**: round-trippable workbook artifact plus merge rules
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weapon_roster::runner::CancelToken;
//! use weapon_roster::sweep::{self, SweepOptions};
//!
//! let token = CancelToken::new();
//! let report = sweep::run(&SweepOptions::default(), &token)?;
//! println!("{:?}", report.output);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Domain inputs
pub mod catalog;
pub mod eligibility;
pub mod error;
pub mod mainstats;
pub mod selection;
pub mod settings;
pub mod sources;
pub mod target;
pub mod variant;

// Sweep
pub mod config_edit;
pub mod merge;
pub mod planner;
pub mod result;
pub mod run_loop;
pub mod runner;
pub mod store;
pub mod sweep;

// Re-export primary types at crate root for convenience
pub use catalog::{EngineData, NameLookup, Weapon, WeaponCatalog, WeaponNames};
pub use eligibility::{compute_total_runs, SourcePolicy};
pub use error::{ConfigError, DataError, RosterError, RosterResult, RunnerError, StoreError};
pub use merge::{merge, Precedence};
pub use planner::{build_plan, WeaponPlan};
pub use result::{CellResult, ResultKey, ResultTable, DEFAULT_VARIANT};
pub use run_loop::{execute, ProgressSink, RunOutcome};
pub use runner::{CancelToken, CellRunner, SearchCell, SimOutcome, SimulationRunner};
pub use sources::AcquisitionSources;
pub use target::Target;
