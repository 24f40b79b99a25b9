//! Merging freshly computed results into a base table.

use tracing::debug;

use crate::result::ResultTable;
use crate::target::Target;

/// How a key present on both sides is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// The computed value always replaces the base value.
    #[default]
    ComputedWins,
    /// The computed value replaces the base value only if it scores strictly
    /// higher under the target.
    KeepBetter(Target),
}

/// Merges `computed` over `base`.
///
/// The variant order is the computed order followed by base-only variants.
/// Keys only in `base` survive unchanged, keys only in `computed` are added.
#[must_use]
pub fn merge(base: &ResultTable, computed: &ResultTable, precedence: Precedence) -> ResultTable {
    let mut merged = ResultTable::new(
        computed
            .variant_order()
            .iter()
            .chain(base.variant_order())
            .cloned(),
    );

    for variant in base.variant_order() {
        for (key, result) in base.rows(variant).into_iter().flatten() {
            merged.insert(variant, key.clone(), result.clone());
        }
    }

    let mut replaced = 0usize;
    let mut kept = 0usize;
    for variant in computed.variant_order() {
        for (key, result) in computed.rows(variant).into_iter().flatten() {
            if let (Precedence::KeepBetter(target), Some(existing)) = (precedence, merged.get(variant, key)) {
                if !target.is_better(result, existing) {
                    kept += 1;
                    continue;
                }
            }
            if merged.insert(variant, key.clone(), result.clone()).is_some() {
                replaced += 1;
            }
        }
    }

    debug!(
        variants = merged.variant_order().len(),
        rows = merged.len(),
        replaced,
        kept,
        "merged result tables"
    );
    merged
}
