//! Result artifact persistence.
//!
//! The artifact is a JSON workbook that is both the human-facing report and
//! the cache the next sweep resumes from:
//!
//! - `Results+Config`: one 7-column block per variant, including the exact
//!   config text of the winning build
//! - `Results`: the same without the config column
//! - `Summary`: best refine per weapon
//! - `Meta`: character, roster, target, timestamp, config fingerprint
//!
//! Writes are atomic (temp file + fsync + rename) and guarded by an
//! exclusive lock on the output directory.

pub mod export;
pub mod file;
pub mod import;
pub mod meta;
pub mod workbook;

use std::fs;
use std::path::Path;

use tracing::{debug, info};

pub use export::{export_workbook, Baseline, ExportContext};
pub use file::{write_atomic, ArtifactLock};
pub use import::{import_workbook, ImportedTable};
pub use meta::{fingerprint, ArtifactMeta};
pub use workbook::{Cell, Sheet, Workbook};

use crate::catalog::{WeaponCatalog, WeaponNames};
use crate::error::StoreError;
use crate::result::ResultTable;

pub const SHEET_DETAILED: &str = "Results+Config";
pub const SHEET_COMPACT: &str = "Results";
pub const SHEET_SUMMARY: &str = "Summary";

pub const BLOCK_WIDTH_DETAILED: usize = 7;
pub const BLOCK_WIDTH_COMPACT: usize = 6;

/// Column C: first variant block.
pub const FIRST_BLOCK_COL: usize = 2;
/// Row 3: first data row (rows 1-2 hold labels and headers).
pub const DATA_START_ROW: usize = 2;

pub const COL_TEAM: usize = 0;
pub const COL_TEAM_PCT: usize = 1;
pub const COL_CHAR: usize = 2;
pub const COL_CHAR_PCT: usize = 3;
pub const COL_ER: usize = 4;
pub const COL_MAIN_STATS: usize = 5;
pub const COL_CONFIG: usize = 6;

/// Exports `table` and writes it atomically to `path`.
pub fn save_table(
    path: &Path,
    table: &ResultTable,
    ctx: &ExportContext<'_>,
    meta: &ArtifactMeta,
) -> Result<(), StoreError> {
    let wb = export_workbook(table, ctx, meta);
    let body = serde_json::to_vec_pretty(&wb).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        message: format!("encode workbook: {e}"),
    })?;
    write_atomic(path, &body)?;
    info!(path = %path.display(), rows = table.len(), "result table written");
    Ok(())
}

/// Reads a workbook file.
pub fn load_workbook(path: &Path) -> Result<Workbook, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reads a previously exported table for use as a merge base.
pub fn load_table(
    path: &Path,
    catalog: &WeaponCatalog,
    names: &WeaponNames,
) -> Result<ImportedTable, StoreError> {
    let wb = load_workbook(path)?;
    let imported = import_workbook(&wb, catalog, names).ok_or_else(|| StoreError::MissingSheet {
        path: path.to_path_buf(),
    })?;
    debug!(path = %path.display(), rows = imported.table.len(), "base table loaded");
    Ok(imported)
}
