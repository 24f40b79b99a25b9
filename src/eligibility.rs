//! Refine eligibility and availability rules.
//!
//! Pure functions of (rarity, acquisition sources). Search history never
//! changes which refines a weapon is tested at.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{Weapon, WeaponCatalog};
use crate::error::DataError;
use crate::sources::AcquisitionSources;

/// Source tags accepted in the acquisition-sources file.
pub const DEFAULT_ALLOWED_SOURCES: &[&str] = &[
    "Стандартная молитва",
    "Магазин Паймон",
    "Ковка",
    "Ивент",
    "Ивентовая оружейная молитва",
    "БП",
    "ПС5",
    "Квесты",
    "Рыбалка",
];

/// Acquisition channels that rotate or are time-limited.
pub const DEFAULT_LIMITED_SOURCES: &[&str] = &["БП", "Ивентовая оружейная молитва", "Магазин Паймон"];

/// Closed source vocabulary plus its limited subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePolicy {
    pub allowed: BTreeSet<String>,
    pub limited: BTreeSet<String>,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ALLOWED_SOURCES.iter().map(ToString::to_string).collect(),
            limited: DEFAULT_LIMITED_SOURCES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SourcePolicy {
    #[must_use]
    pub fn is_allowed(&self, tag: &str) -> bool {
        self.allowed.contains(tag)
    }

    /// True if at least one source lies outside the limited subset.
    #[must_use]
    pub fn has_non_limited(&self, sources: &[String]) -> bool {
        sources.iter().any(|s| !self.limited.contains(s))
    }

    /// Refine levels to test for a weapon, ascending.
    ///
    /// Rarity 5 is tested at r1 only. Rarity 4 is tested at r5 only when it
    /// can be farmed through a non-limited channel, otherwise at r1 and r5.
    /// Everything else is assumed maxed.
    #[must_use]
    pub fn refines_for_weapon(&self, weapon: &Weapon, sources: &[String]) -> Vec<u8> {
        match weapon.rarity {
            5 => vec![1],
            4 if self.has_non_limited(sources) => vec![5],
            4 => vec![1, 5],
            _ => vec![5],
        }
    }

    /// Whether a weapon counts toward the "best available" percentage
    /// baseline. Not a filter on what gets simulated.
    #[must_use]
    pub fn is_available_weapon(&self, weapon: &Weapon, sources: &[String]) -> bool {
        match weapon.rarity {
            3 => true,
            4 => self.has_non_limited(sources),
            _ => false,
        }
    }
}

/// Number of simulations a full sweep over `weapons` performs.
pub fn compute_total_runs(
    weapons: &[String],
    catalog: &WeaponCatalog,
    sources: &AcquisitionSources,
    policy: &SourcePolicy,
    combo_count: usize,
    variant_count: usize,
) -> Result<usize, DataError> {
    let variant_count = variant_count.max(1);
    let mut total = 0;
    for key in weapons {
        let weapon = catalog.get(key).ok_or_else(|| DataError::WeaponNotInCatalog {
            weapon: key.clone(),
        })?;
        total += policy.refines_for_weapon(weapon, sources.get(key)).len() * combo_count * variant_count;
    }
    Ok(total)
}
