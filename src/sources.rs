//! Acquisition sources per weapon.
//!
//! Loaded from a side file mapping weapon key to an ordered list of source
//! tags. Every tag must belong to the closed vocabulary of the active
//! [`SourcePolicy`]; an unknown tag is fatal.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::catalog::{read_json, WeaponCatalog};
use crate::eligibility::SourcePolicy;
use crate::error::{ConfigError, DataError, RosterError};
use crate::store::file::write_atomic;

/// Weapon key to ordered source tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionSources {
    by_weapon: BTreeMap<String, Vec<String>>,
}

impl AcquisitionSources {
    /// Reads the sources file. A missing file yields an empty mapping.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let by_weapon: BTreeMap<String, Vec<String>> = read_json(path)?;
        Ok(Self { by_weapon })
    }

    /// Reads and validates in one step.
    pub fn load_validated(path: &Path, policy: &SourcePolicy) -> Result<Self, ConfigError> {
        let sources = Self::load(path)?;
        sources.validate(policy)?;
        Ok(sources)
    }

    /// Rejects any tag outside the policy's vocabulary.
    pub fn validate(&self, policy: &SourcePolicy) -> Result<(), ConfigError> {
        for (weapon, tags) in &self.by_weapon {
            if let Some(bad) = tags.iter().find(|t| !policy.is_allowed(t)) {
                return Err(ConfigError::UnsupportedSource {
                    weapon: weapon.clone(),
                    source_tag: bad.clone(),
                });
            }
        }
        Ok(())
    }

    /// Source tags of a weapon; empty when the weapon is not listed.
    #[must_use]
    pub fn get(&self, weapon: &str) -> &[String] {
        self.by_weapon.get(weapon).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, weapon: &str) -> bool {
        self.by_weapon.contains_key(weapon)
    }

    pub fn insert(&mut self, weapon: impl Into<String>, tags: Vec<String>) {
        self.by_weapon.insert(weapon.into(), tags);
    }

    /// Checks that every rarity-4 candidate has a non-empty source list.
    ///
    /// Missing weapons are added to the file at `path` as empty stubs so the
    /// operator only has to fill them in.
    pub fn ensure_ready(
        &mut self,
        weapons: &[String],
        catalog: &WeaponCatalog,
        path: &Path,
    ) -> Result<SourceReadiness, RosterError> {
        let mut readiness = SourceReadiness::default();
        for key in weapons {
            let weapon = catalog.get(key).ok_or_else(|| DataError::WeaponNotInCatalog {
                weapon: key.clone(),
            })?;
            if weapon.rarity != 4 {
                continue;
            }
            match self.by_weapon.get(key) {
                None => readiness.missing.push(key.clone()),
                Some(tags) if tags.is_empty() => readiness.empty.push(key.clone()),
                Some(_) => {}
            }
        }
        readiness.missing.sort();
        readiness.empty.sort();

        if !readiness.missing.is_empty() {
            for key in &readiness.missing {
                self.by_weapon.insert(key.clone(), Vec::new());
            }
            let body = serde_json::to_vec_pretty(&self.by_weapon)
                .map_err(|e| RosterError::internal(format!("encode sources: {e}")))?;
            write_atomic(path, &body)?;
            info!(count = readiness.missing.len(), path = %path.display(), "added source stubs");
        }
        Ok(readiness)
    }
}

/// Result of [`AcquisitionSources::ensure_ready`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReadiness {
    /// Rarity-4 weapons that had no entry (a stub was written).
    pub missing: Vec<String>,
    /// Rarity-4 weapons listed with no sources.
    pub empty: Vec<String>,
}

impl SourceReadiness {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty() && self.empty.is_empty()
    }
}
