//! Workbook back to result table.
//!
//! Import is tolerant of hand edits: rows with a missing identity cell, an
//! unparsable refine or an unresolvable weapon are skipped with a warning.
//! A variant block with neither metric filled is omitted for that row
//! rather than read as zero.

use tracing::{debug, warn};

use crate::catalog::{NameLookup, WeaponCatalog, WeaponNames};
use crate::result::{CellResult, ResultKey, ResultTable, DEFAULT_VARIANT};

use super::meta::{ArtifactMeta, META_SHEET};
use super::workbook::{column_name, Sheet, Workbook};
use super::{
    BLOCK_WIDTH_COMPACT, BLOCK_WIDTH_DETAILED, COL_CHAR, COL_CONFIG, COL_ER, COL_MAIN_STATS,
    COL_TEAM, DATA_START_ROW, FIRST_BLOCK_COL, SHEET_COMPACT, SHEET_DETAILED,
};

/// A table read from disk plus whatever metadata it carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedTable {
    pub table: ResultTable,
    pub meta: Option<ArtifactMeta>,
}

/// Picks the results sheet: the detailed one if present, else the compact one.
fn results_sheet(wb: &Workbook) -> Option<(&Sheet, usize)> {
    wb.sheet(SHEET_DETAILED)
        .map(|s| (s, BLOCK_WIDTH_DETAILED))
        .or_else(|| wb.sheet(SHEET_COMPACT).map(|s| (s, BLOCK_WIDTH_COMPACT)))
}

fn variant_labels(sheet: &Sheet, block_width: usize) -> Vec<String> {
    let mut labels = Vec::new();
    let mut col = FIRST_BLOCK_COL;
    while let Some(name) = sheet.text(0, col) {
        labels.push(name);
        col += block_width;
    }
    labels
}

fn parse_refine(raw: &str) -> Option<u8> {
    raw.trim().parse::<u8>().ok()
}

/// Reads the result table out of a workbook.
///
/// Returns `None` when the workbook has no results sheet at all.
#[must_use]
pub fn import_workbook(
    wb: &Workbook,
    catalog: &WeaponCatalog,
    names: &WeaponNames,
) -> Option<ImportedTable> {
    let (sheet, block_width) = results_sheet(wb)?;
    let labels = variant_labels(sheet, block_width);
    let legacy = labels.is_empty();
    let variant_order = if legacy {
        vec![DEFAULT_VARIANT.to_string()]
    } else {
        labels
    };

    let mut table = ResultTable::new(variant_order.iter().cloned());
    let mut skipped = 0usize;
    for row in DATA_START_ROW..sheet.row_count() {
        let weapon_cell = sheet.text(row, 0);
        let refine_cell = sheet.text(row, 1);
        let (weapon_cell, refine_cell) = match (weapon_cell, refine_cell) {
            (None, None) => break,
            (Some(w), Some(r)) => (w, r),
            _ => {
                skipped += 1;
                continue;
            }
        };
        let Some(refine) = parse_refine(&refine_cell) else {
            warn!(row = row + 1, refine = %refine_cell, "skipping row with unparsable refine");
            skipped += 1;
            continue;
        };
        let weapon = match names.resolve(&weapon_cell, catalog) {
            NameLookup::Unique(key) => key,
            NameLookup::NotFound => {
                warn!(row = row + 1, weapon = %weapon_cell, "skipping row with unknown weapon");
                skipped += 1;
                continue;
            }
            NameLookup::Ambiguous(keys) => {
                warn!(
                    row = row + 1,
                    weapon = %weapon_cell,
                    candidates = %keys.join(", "),
                    "skipping row with ambiguous weapon name"
                );
                skipped += 1;
                continue;
            }
        };
        let key = ResultKey::new(weapon, refine);

        for (i, variant) in variant_order.iter().enumerate() {
            let start = FIRST_BLOCK_COL + i * block_width;
            let team = sheet.cell(row, start + COL_TEAM).and_then(|c| c.as_i64());
            let char = sheet.cell(row, start + COL_CHAR).and_then(|c| c.as_i64());
            if team.is_none() && char.is_none() {
                debug!(
                    cell = %format!("{}{}", column_name(start), row + 1),
                    variant = %variant,
                    "no metrics in block"
                );
                continue;
            }
            let config = if block_width > COL_CONFIG {
                sheet.raw_text(row, start + COL_CONFIG).unwrap_or_default()
            } else {
                String::new()
            };
            let result = CellResult {
                team_metric: team.unwrap_or(0),
                char_metric: char.unwrap_or(0),
                energy_recharge: sheet
                    .cell(row, start + COL_ER)
                    .and_then(|c| c.as_f64())
                    .unwrap_or(0.0),
                main_stats: sheet
                    .raw_text(row, start + COL_MAIN_STATS)
                    .unwrap_or_default(),
                config,
            };
            table.insert(variant, key.clone(), result);
        }
    }

    if legacy && table.is_empty() {
        table = ResultTable::default();
    }
    if skipped > 0 {
        warn!(skipped, sheet = %sheet.name, "skipped malformed rows while importing results");
    }

    let meta = wb.sheet(META_SHEET).and_then(ArtifactMeta::from_sheet);
    Some(ImportedTable { table, meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Weapon;
    use crate::store::workbook::Cell;
    use std::collections::HashMap;

    fn catalog() -> WeaponCatalog {
        WeaponCatalog::from_weapons(["alpha", "beta", "dupe_a", "dupe_b"].iter().map(|k| Weapon {
            key: (*k).to_string(),
            rarity: 4,
            weapon_class: "sword".to_string(),
        }))
    }

    fn names() -> WeaponNames {
        WeaponNames::new(HashMap::from([
            ("alpha".to_string(), "Альфа".to_string()),
            ("dupe_a".to_string(), "Двойник".to_string()),
            ("dupe_b".to_string(), "Двойник".to_string()),
        ]))
    }

    fn compact_sheet() -> Sheet {
        let mut s = Sheet::new(SHEET_COMPACT);
        s.set(0, 0, "Weapon");
        s.set(0, 1, "Refine");
        s.set(0, 2, "v1");
        s.set(0, 8, "v2");
        s
    }

    fn fill(s: &mut Sheet, row: usize, weapon: &str, refine: &str, start: usize, team: Cell) {
        s.set(row, 0, weapon);
        s.set(row, 1, refine);
        s.set(row, start, team);
        s.set(row, start + 2, 100_i64);
        s.set(row, start + 4, "120,5%");
        s.set(row, start + 5, "atk% pyro% cr");
    }

    #[test]
    fn test_tolerant_rows() {
        let mut s = compact_sheet();
        fill(&mut s, 2, "Альфа", "5", 2, Cell::Int(1000));
        fill(&mut s, 3, "beta", "x", 2, Cell::Int(1000));
        fill(&mut s, 4, "Двойник", "1", 2, Cell::Int(1000));
        fill(&mut s, 5, "ghost", "1", 2, Cell::Int(1000));
        s.set(6, 0, "beta");
        fill(&mut s, 7, "beta", "1", 8, Cell::from("2 000"));
        // Both identity cells empty: stop scanning.
        fill(&mut s, 9, "beta", "5", 2, Cell::Int(7));
        s.rows[9][0] = None;
        s.rows[9][1] = None;
        fill(&mut s, 10, "alpha", "1", 2, Cell::Int(1));

        let wb = Workbook { sheets: vec![s] };
        let imported = import_workbook(&wb, &catalog(), &names()).unwrap();
        let table = imported.table;
        assert_eq!(table.variant_order(), &["v1".to_string(), "v2".to_string()]);
        assert_eq!(table.len(), 2);

        let alpha = table.get("v1", &ResultKey::new("alpha", 5)).unwrap();
        assert_eq!(alpha.team_metric, 1000);
        assert_eq!(alpha.energy_recharge, 1.205);
        assert!(alpha.config.is_empty());
        assert!(!table.contains("v2", &ResultKey::new("alpha", 5)));

        let beta = table.get("v2", &ResultKey::new("beta", 1)).unwrap();
        assert_eq!(beta.team_metric, 2000);
        assert!(!table.contains("v1", &ResultKey::new("beta", 1)));
        assert!(!table.contains("v1", &ResultKey::new("alpha", 1)));
        assert!(imported.meta.is_none());
    }

    #[test]
    fn test_prefers_detailed_sheet() {
        let mut detailed = Sheet::new(SHEET_DETAILED);
        detailed.set(0, 2, "full");
        detailed.set(2, 0, "alpha");
        detailed.set(2, 1, "5");
        detailed.set(2, 2, 10_i64);
        detailed.set(2, 8, "alpha add weapon=\"alpha\" refine=5;");
        let mut compact = compact_sheet();
        fill(&mut compact, 2, "alpha", "5", 2, Cell::Int(99));

        let wb = Workbook {
            sheets: vec![compact, detailed],
        };
        let table = import_workbook(&wb, &catalog(), &names()).unwrap().table;
        assert_eq!(table.variant_order(), &["full".to_string()]);
        let r = table.get("full", &ResultKey::new("alpha", 5)).unwrap();
        assert_eq!(r.team_metric, 10);
        assert_eq!(r.char_metric, 0);
        assert!(r.config.contains("refine=5"));
    }

    #[test]
    fn test_unlabelled_sheet_reads_default_variant() {
        let mut s = Sheet::new(SHEET_COMPACT);
        fill(&mut s, 2, "alpha", "5", 2, Cell::Int(5));
        let wb = Workbook { sheets: vec![s] };
        let table = import_workbook(&wb, &catalog(), &names()).unwrap().table;
        assert_eq!(table.variant_order(), &[DEFAULT_VARIANT.to_string()]);
        assert_eq!(table.len(), 1);

        let empty = Workbook {
            sheets: vec![Sheet::new(SHEET_COMPACT)],
        };
        let table = import_workbook(&empty, &catalog(), &names()).unwrap().table;
        assert!(table.variant_order().is_empty());
    }

    #[test]
    fn test_missing_results_sheet() {
        let wb = Workbook {
            sheets: vec![Sheet::new("Other")],
        };
        assert!(import_workbook(&wb, &catalog(), &names()).is_none());
    }
}
