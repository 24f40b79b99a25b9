//! Result table to workbook.
//!
//! Layout per results sheet:
//! - row 1: `Weapon`, `Refine`, then the variant name at the first column
//!   of each block
//! - row 2: column headers of every block
//! - row 3 onward: one row per (weapon, refine)
//!
//! Block columns are team metric, team fraction, character metric,
//! character fraction, energy recharge, main stats and, in the detailed
//! sheet only, the config snapshot.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{NameLookup, WeaponCatalog, WeaponNames};
use crate::eligibility::SourcePolicy;
use crate::result::{CellResult, ResultKey, ResultTable};
use crate::sources::AcquisitionSources;
use crate::target::Target;

use super::meta::ArtifactMeta;
use super::workbook::{Sheet, Workbook};
use super::{
    BLOCK_WIDTH_COMPACT, BLOCK_WIDTH_DETAILED, COL_CHAR, COL_CHAR_PCT, COL_CONFIG, COL_ER,
    COL_MAIN_STATS, COL_TEAM, COL_TEAM_PCT, DATA_START_ROW, FIRST_BLOCK_COL, SHEET_COMPACT,
    SHEET_DETAILED, SHEET_SUMMARY,
};

const HEADERS: [&str; BLOCK_WIDTH_DETAILED] = [
    "Team DPS", "Team %", "Char DPS", "Char %", "ER", "Main Stats", "Config",
];

/// Read-only inputs the exporter needs besides the table itself.
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    pub catalog: &'a WeaponCatalog,
    pub names: &'a WeaponNames,
    pub sources: &'a AcquisitionSources,
    pub policy: &'a SourcePolicy,
    pub target: Target,
}

/// Per-variant denominators for the fraction columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baseline {
    pub team: i64,
    pub char: i64,
}

impl Baseline {
    /// Best metrics over available weapons, falling back to the overall
    /// best when no available weapon scored above zero.
    #[must_use]
    pub fn compute(rows: &BTreeMap<ResultKey, CellResult>, ctx: &ExportContext<'_>) -> Self {
        let mut overall = Self::default();
        let mut available = Self::default();
        for (key, r) in rows {
            overall.team = overall.team.max(r.team_metric);
            overall.char = overall.char.max(r.char_metric);
            let is_available = ctx
                .catalog
                .get(&key.weapon)
                .is_some_and(|w| ctx.policy.is_available_weapon(w, ctx.sources.get(&key.weapon)));
            if is_available {
                available.team = available.team.max(r.team_metric);
                available.char = available.char.max(r.char_metric);
            }
        }
        Self {
            team: if available.team > 0 { available.team } else { overall.team },
            char: if available.char > 0 { available.char } else { overall.char },
        }
    }
}

fn fraction(value: i64, baseline: i64) -> Option<f64> {
    (baseline > 0).then(|| (value as f64 / baseline as f64 * 10_000.0).round() / 10_000.0)
}

/// Row order: primary-variant rows by target metric descending (ties by
/// key), then keys that only non-primary variants hold, in key order.
#[must_use]
pub fn row_order(table: &ResultTable, target: Target) -> Vec<ResultKey> {
    let mut keys: Vec<(&ResultKey, i64)> = table
        .primary_variant()
        .and_then(|v| table.rows(v))
        .map(|rows| rows.iter().map(|(k, r)| (k, target.metric(r))).collect())
        .unwrap_or_default();
    keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut ordered: Vec<ResultKey> = keys.into_iter().map(|(k, _)| k.clone()).collect();
    let seen: BTreeSet<ResultKey> = ordered.iter().cloned().collect();
    let extra: BTreeSet<&ResultKey> = table
        .variant_order()
        .iter()
        .skip(1)
        .filter_map(|v| table.rows(v))
        .flat_map(BTreeMap::keys)
        .filter(|k| !seen.contains(*k))
        .collect();
    ordered.extend(extra.into_iter().cloned());
    ordered
}

/// For every weapon, the refine scoring best under the primary variant.
/// Order follows [`row_order`].
#[must_use]
pub fn summary_order(table: &ResultTable, target: Target) -> Vec<ResultKey> {
    let mut seen = BTreeSet::new();
    row_order(table, target)
        .into_iter()
        .filter(|key| {
            table
                .primary_variant()
                .is_some_and(|v| table.contains(v, key))
        })
        .filter(|key| seen.insert(key.weapon.clone()))
        .collect()
}

/// Weapon column text: the display name when it reads back as this same
/// key, otherwise the catalog key.
#[must_use]
pub fn weapon_label<'a>(key: &'a str, ctx: &ExportContext<'a>) -> &'a str {
    let label = ctx.names.label(key);
    match ctx.names.resolve(label, ctx.catalog) {
        NameLookup::Unique(resolved) if resolved == key => label,
        _ => key,
    }
}

fn results_sheet(
    name: &str,
    table: &ResultTable,
    keys: &[ResultKey],
    block_width: usize,
    baselines: &[Baseline],
    ctx: &ExportContext<'_>,
) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.set(0, 0, "Weapon");
    sheet.set(0, 1, "Refine");
    for (i, variant) in table.variant_order().iter().enumerate() {
        let start = FIRST_BLOCK_COL + i * block_width;
        sheet.set(0, start, variant.as_str());
        for (offset, header) in HEADERS.iter().take(block_width).enumerate() {
            sheet.set(1, start + offset, *header);
        }
    }

    for (i, key) in keys.iter().enumerate() {
        let row = DATA_START_ROW + i;
        sheet.set(row, 0, weapon_label(&key.weapon, ctx));
        sheet.set(row, 1, i64::from(key.refine));
        for (vi, variant) in table.variant_order().iter().enumerate() {
            let Some(r) = table.get(variant, key) else {
                continue;
            };
            let start = FIRST_BLOCK_COL + vi * block_width;
            let baseline = baselines.get(vi).copied().unwrap_or_default();
            sheet.set(row, start + COL_TEAM, r.team_metric);
            sheet.set_opt(row, start + COL_TEAM_PCT, fraction(r.team_metric, baseline.team));
            sheet.set(row, start + COL_CHAR, r.char_metric);
            sheet.set_opt(row, start + COL_CHAR_PCT, fraction(r.char_metric, baseline.char));
            sheet.set(row, start + COL_ER, r.energy_recharge);
            sheet.set(row, start + COL_MAIN_STATS, r.main_stats.as_str());
            if block_width > COL_CONFIG {
                sheet.set(row, start + COL_CONFIG, r.config.as_str());
            }
        }
    }
    sheet
}

/// Builds the full workbook for a result table.
#[must_use]
pub fn export_workbook(table: &ResultTable, ctx: &ExportContext<'_>, meta: &ArtifactMeta) -> Workbook {
    let baselines: Vec<Baseline> = table
        .variant_order()
        .iter()
        .map(|v| table.rows(v).map(|rows| Baseline::compute(rows, ctx)).unwrap_or_default())
        .collect();
    let keys = row_order(table, ctx.target);
    let summary = summary_order(table, ctx.target);

    let mut wb = Workbook::default();
    wb.push(results_sheet(SHEET_DETAILED, table, &keys, BLOCK_WIDTH_DETAILED, &baselines, ctx));
    wb.push(results_sheet(SHEET_COMPACT, table, &keys, BLOCK_WIDTH_COMPACT, &baselines, ctx));
    wb.push(results_sheet(SHEET_SUMMARY, table, &summary, BLOCK_WIDTH_COMPACT, &baselines, ctx));
    wb.push(meta.to_sheet());
    wb
}
