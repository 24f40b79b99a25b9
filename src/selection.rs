//! Candidate weapon selection.
//!
//! By default every catalog weapon of the character's class at or above a
//! minimum rarity is swept. An explicit list narrows that down and may add
//! refines on top of the default set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::catalog::{NameLookup, Weapon, WeaponCatalog, WeaponNames};
use crate::eligibility::SourcePolicy;
use crate::error::ConfigError;

/// Lowest and highest refine a weapon entry may name.
pub const REFINE_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

/// Splits the catalog into weapons of `weapon_class` at or above
/// `min_rarity` and the rest of that class. Both lists are sorted by key.
#[must_use]
pub fn select_by_class_and_rarity(
    catalog: &WeaponCatalog,
    weapon_class: &str,
    min_rarity: u8,
) -> (Vec<String>, Vec<String>) {
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for w in catalog.iter().filter(|w| w.weapon_class == weapon_class) {
        if w.rarity >= min_rarity {
            included.push(w.key.clone());
        } else {
            excluded.push(w.key.clone());
        }
    }
    included.sort();
    excluded.sort();
    (included, excluded)
}

/// Rarity descending, then key ascending. Keys missing from the catalog sort last.
#[must_use]
pub fn sort_by_rarity_desc_then_key(weapons: &[String], catalog: &WeaponCatalog) -> Vec<String> {
    let rarity = |k: &str| catalog.get(k).map_or(-1, |w| i16::from(w.rarity));
    let mut out = weapons.to_vec();
    out.sort_by(|a, b| rarity(b.as_str()).cmp(&rarity(a.as_str())).then_with(|| a.cmp(b)));
    out
}

/// One parsed `"<name> [refine...]"` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponEntry {
    pub name: String,
    /// Explicit refines in entry order; empty for a bare name.
    pub refines: Vec<u8>,
}

/// Parses an entry like `"Меч Фавония 1 5"`: trailing integers are refines,
/// everything before them is the name.
pub fn parse_weapon_entry(raw: &str) -> Result<WeaponEntry, ConfigError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.is_empty() {
        return Err(ConfigError::MalformedWeaponEntry {
            entry: raw.to_string(),
        });
    }
    let mut split = fields.len();
    let mut refines = Vec::new();
    while split > 0 {
        let Ok(r) = fields[split - 1].parse::<i64>() else {
            break;
        };
        if !REFINE_RANGE.contains(&r) {
            return Err(ConfigError::InvalidRefine {
                entry: raw.to_string(),
                refine: r,
            });
        }
        refines.push(r as u8);
        split -= 1;
    }
    if split == 0 {
        return Err(ConfigError::MalformedWeaponEntry {
            entry: raw.to_string(),
        });
    }
    refines.reverse();
    Ok(WeaponEntry {
        name: fields[..split].join(" "),
        refines,
    })
}

/// What the operator asked for one weapon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeaponRequest {
    /// Include the eligibility-derived default refines.
    pub include_default: bool,
    /// Refines requested explicitly.
    pub refines: BTreeSet<u8>,
}

impl WeaponRequest {
    fn absorb(&mut self, other: &WeaponRequest) {
        self.include_default |= other.include_default;
        self.refines.extend(other.refines.iter().copied());
    }
}

/// Resolved weapon list in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeaponSelection {
    pub weapons: Vec<String>,
    /// Present only for weapons that came from an explicit list.
    pub requests: HashMap<String, WeaponRequest>,
}

impl WeaponSelection {
    /// Every weapon at its default refines.
    #[must_use]
    pub fn all(weapons: Vec<String>) -> Self {
        Self {
            weapons,
            requests: HashMap::new(),
        }
    }

    /// Refines to test for `weapon`, ascending.
    ///
    /// Weapons without a request use the eligibility default. A request
    /// unions the default (when asked for) with its explicit refines.
    #[must_use]
    pub fn refines_for(&self, weapon: &Weapon, sources: &[String], policy: &SourcePolicy) -> Vec<u8> {
        let Some(req) = self.requests.get(&weapon.key) else {
            return policy.refines_for_weapon(weapon, sources);
        };
        let mut set = req.refines.clone();
        if req.include_default {
            set.extend(policy.refines_for_weapon(weapon, sources));
        }
        set.into_iter().collect()
    }
}

/// Resolves explicit entries against the catalog.
///
/// Names match a catalog key or a unique display name exactly. Unknown
/// names are collected and reported together, as are weapons of the wrong
/// class. An ambiguous display name fails immediately. Entries naming the
/// same weapon are merged; order follows first appearance.
pub fn resolve_requests(
    entries: &[String],
    catalog: &WeaponCatalog,
    names: &WeaponNames,
    character: &str,
    weapon_class: &str,
) -> Result<WeaponSelection, ConfigError> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: BTreeMap<String, WeaponRequest> = BTreeMap::new();
    for raw in entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let entry = parse_weapon_entry(raw)?;
        let req = by_name.entry(entry.name.clone()).or_insert_with(|| {
            order.push(entry.name.clone());
            WeaponRequest::default()
        });
        if entry.refines.is_empty() {
            req.include_default = true;
        } else {
            req.refines.extend(entry.refines);
        }
    }

    let mut selection = WeaponSelection::default();
    let mut unknown = Vec::new();
    let mut wrong_class = Vec::new();
    for name in &order {
        let key = match names.resolve(name, catalog) {
            NameLookup::Unique(key) => key,
            NameLookup::NotFound => {
                unknown.push(name.clone());
                continue;
            }
            NameLookup::Ambiguous(keys) => {
                return Err(ConfigError::AmbiguousWeaponName {
                    name: name.clone(),
                    keys,
                });
            }
        };
        let Some(weapon) = catalog.get(&key) else {
            unknown.push(name.clone());
            continue;
        };
        if weapon.weapon_class != weapon_class {
            wrong_class.push(key);
            continue;
        }
        let Some(req) = by_name.get(name) else {
            continue;
        };
        match selection.requests.get_mut(&key) {
            Some(existing) => existing.absorb(req),
            None => {
                selection.requests.insert(key.clone(), req.clone());
                selection.weapons.push(key);
            }
        }
    }

    if !unknown.is_empty() {
        return Err(ConfigError::UnknownWeapons { names: unknown });
    }
    if !wrong_class.is_empty() {
        return Err(ConfigError::IncompatibleWeapons {
            character: character.to_string(),
            weapon_class: weapon_class.to_string(),
            weapons: wrong_class,
        });
    }
    Ok(selection)
}
