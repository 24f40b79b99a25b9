//! Result types: one best build per (weapon, refine, variant).
//!
//! A `ResultTable` is the durable artifact of a sweep. Every run produces one,
//! and may consume one from a prior run as its base.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name used when a configuration declares no variants.
pub const DEFAULT_VARIANT: &str = "default";

/// Row identity inside one variant's result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    pub weapon: String,
    pub refine: u8,
}

impl ResultKey {
    #[must_use]
    pub fn new(weapon: impl Into<String>, refine: u8) -> Self {
        Self {
            weapon: weapon.into(),
            refine,
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} r{}", self.weapon, self.refine)
    }
}

/// Best outcome across all main-stat combos for one (weapon, refine, variant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellResult {
    /// Whole-team throughput (truncated mean).
    pub team_metric: i64,
    /// Throughput of the optimized character (truncated mean).
    pub char_metric: i64,
    /// Energy recharge snapshot of the optimized character.
    pub energy_recharge: f64,
    /// Label of the winning main-stat combo.
    pub main_stats: String,
    /// Exact configuration text the simulator ran for the winning combo.
    pub config: String,
}

/// Ordered variant list plus `variant -> (key -> result)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    variant_order: Vec<String>,
    by_variant: HashMap<String, BTreeMap<ResultKey, CellResult>>,
}

impl ResultTable {
    /// Creates an empty table with the given variant order.
    ///
    /// Duplicate names are kept once, at their first position.
    #[must_use]
    pub fn new<I, S>(variant_order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for v in variant_order {
            table.ensure_variant(v.into());
        }
        table
    }

    /// Appends a variant to the order if it is not present yet.
    pub fn ensure_variant(&mut self, variant: impl Into<String>) {
        let variant = variant.into();
        if !self.by_variant.contains_key(&variant) {
            self.variant_order.push(variant.clone());
            self.by_variant.insert(variant, BTreeMap::new());
        }
    }

    /// Variants in declaration order.
    #[must_use]
    pub fn variant_order(&self) -> &[String] {
        &self.variant_order
    }

    /// The first variant, which fixes the exported row order.
    #[must_use]
    pub fn primary_variant(&self) -> Option<&str> {
        self.variant_order.first().map(String::as_str)
    }

    /// Inserts (or replaces) a result, registering the variant if needed.
    pub fn insert(&mut self, variant: &str, key: ResultKey, result: CellResult) -> Option<CellResult> {
        self.ensure_variant(variant);
        self.by_variant
            .get_mut(variant)
            .and_then(|rows| rows.insert(key, result))
    }

    #[must_use]
    pub fn get(&self, variant: &str, key: &ResultKey) -> Option<&CellResult> {
        self.by_variant.get(variant).and_then(|rows| rows.get(key))
    }

    #[must_use]
    pub fn contains(&self, variant: &str, key: &ResultKey) -> bool {
        self.get(variant, key).is_some()
    }

    /// Rows of one variant, ordered by key.
    #[must_use]
    pub fn rows(&self, variant: &str) -> Option<&BTreeMap<ResultKey, CellResult>> {
        self.by_variant.get(variant)
    }

    /// True if every variant in `variants` has a result for `key`.
    #[must_use]
    pub fn has_all_variants(&self, key: &ResultKey, variants: &[String]) -> bool {
        variants.iter().all(|v| self.contains(v, key))
    }

    /// Total number of stored results across variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_variant.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves every result of `other` into this table, later values winning.
    pub fn absorb(&mut self, other: ResultTable) {
        let ResultTable {
            variant_order,
            mut by_variant,
        } = other;
        for v in variant_order {
            let rows = by_variant.remove(&v).unwrap_or_default();
            self.ensure_variant(v.clone());
            if let Some(target) = self.by_variant.get_mut(&v) {
                target.extend(rows);
            }
        }
    }
}
