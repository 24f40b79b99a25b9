//! Static weapon and character catalogs.
//!
//! Catalogs are loaded once per run from the engine's generated data files
//! and are read-only afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Relative location of the weapon catalog inside an engine checkout.
pub const WEAPON_DATA_PATH: &str = "ui/packages/ui/src/Data/weapon_data.generated.json";
/// Relative location of the character catalog inside an engine checkout.
pub const CHAR_DATA_PATH: &str = "ui/packages/ui/src/Data/char_data.generated.json";
/// Relative location of the localized display names.
pub const NAMES_PATH: &str = "ui/packages/localization/src/locales/names.generated.json";
/// Locale whose weapon names appear in exported tables.
pub const DISPLAY_LOCALE: &str = "Russian";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub key: String,
    pub rarity: u8,
    pub weapon_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub key: String,
    pub weapon_class: String,
}

/// Weapon lookup by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponCatalog {
    pub data: HashMap<String, Weapon>,
}

impl WeaponCatalog {
    #[must_use]
    pub fn from_weapons(weapons: impl IntoIterator<Item = Weapon>) -> Self {
        Self {
            data: weapons.into_iter().map(|w| (w.key.clone(), w)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Weapon> {
        self.data.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Weapon> {
        self.data.values()
    }
}

/// Character lookup by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterCatalog {
    pub data: HashMap<String, Character>,
}

impl CharacterCatalog {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Character> {
        self.data.get(key)
    }
}

/// Outcome of resolving a display name back to a catalog key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameLookup {
    Unique(String),
    NotFound,
    /// Several keys share the display name; the candidates are sorted.
    Ambiguous(Vec<String>),
}

/// Human-readable weapon names, keyed by catalog key.
#[derive(Debug, Clone, Default)]
pub struct WeaponNames {
    by_key: HashMap<String, String>,
    by_name: BTreeMap<String, Vec<String>>,
}

impl WeaponNames {
    #[must_use]
    pub fn new(by_key: HashMap<String, String>) -> Self {
        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, name) in &by_key {
            if name.trim().is_empty() {
                continue;
            }
            by_name.entry(name.clone()).or_default().push(key.clone());
        }
        for keys in by_name.values_mut() {
            keys.sort();
        }
        Self { by_key, by_name }
    }

    /// Display name for a key, if one is known.
    #[must_use]
    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.by_key
            .get(key)
            .map(String::as_str)
            .filter(|n| !n.trim().is_empty())
    }

    /// Display name for a key, falling back to the key itself.
    #[must_use]
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.display_name(key).unwrap_or(key)
    }

    /// Exact reverse lookup of a display name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> NameLookup {
        match self.by_name.get(name) {
            None => NameLookup::NotFound,
            Some(keys) if keys.len() == 1 => NameLookup::Unique(keys[0].clone()),
            Some(keys) => NameLookup::Ambiguous(keys.clone()),
        }
    }

    /// Resolves a table or config token: a catalog key first, then a unique
    /// display name.
    #[must_use]
    pub fn resolve(&self, token: &str, catalog: &WeaponCatalog) -> NameLookup {
        if catalog.contains(token) {
            return NameLookup::Unique(token.to_string());
        }
        self.lookup(token)
    }
}

/// Everything read from an engine checkout.
#[derive(Debug, Clone, Default)]
pub struct EngineData {
    pub weapons: WeaponCatalog,
    pub characters: CharacterCatalog,
    pub names: WeaponNames,
}

impl EngineData {
    /// Loads the generated catalogs below `engine_root`.
    pub fn load(engine_root: &Path) -> Result<Self, ConfigError> {
        let weapons: WeaponCatalog = read_json(&engine_root.join(WEAPON_DATA_PATH))?;
        let characters: CharacterCatalog = read_json(&engine_root.join(CHAR_DATA_PATH))?;

        let names_path = engine_root.join(NAMES_PATH);
        let mut locales: HashMap<String, HashMap<String, HashMap<String, String>>> =
            read_json(&names_path)?;
        let mut locale = locales
            .remove(DISPLAY_LOCALE)
            .ok_or_else(|| ConfigError::Malformed {
                path: names_path.clone(),
                reason: format!("missing {DISPLAY_LOCALE} locale"),
            })?;
        let weapon_names = locale
            .remove("weapon_names")
            .ok_or_else(|| ConfigError::Malformed {
                path: names_path,
                reason: format!("missing {DISPLAY_LOCALE}.weapon_names"),
            })?;

        Ok(Self {
            weapons,
            characters,
            names: WeaponNames::new(weapon_names),
        })
    }
}

/// Checks that `root` looks like an engine checkout.
pub fn validate_engine_root(root: PathBuf) -> Result<PathBuf, ConfigError> {
    let probe = root.join(WEAPON_DATA_PATH);
    if !probe.exists() {
        return Err(ConfigError::InvalidEngineRoot {
            reason: format!("{} is missing {}", root.display(), probe.display()),
        });
    }
    Ok(root)
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names() -> WeaponNames {
        let mut m = HashMap::new();
        m.insert("favoniussword".to_string(), "Меч Фавония".to_string());
        m.insert("dupe_a".to_string(), "Близнец".to_string());
        m.insert("dupe_b".to_string(), "Близнец".to_string());
        m.insert("noname".to_string(), "  ".to_string());
        WeaponNames::new(m)
    }

    #[test]
    fn test_lookup_tri_state() {
        let n = names();
        assert_eq!(n.lookup("Меч Фавония"), NameLookup::Unique("favoniussword".to_string()));
        assert_eq!(n.lookup("Нет такого"), NameLookup::NotFound);
        assert_eq!(
            n.lookup("Близнец"),
            NameLookup::Ambiguous(vec!["dupe_a".to_string(), "dupe_b".to_string()])
        );
    }

    #[test]
    fn test_label_falls_back_to_key() {
        let n = names();
        assert_eq!(n.label("favoniussword"), "Меч Фавония");
        assert_eq!(n.label("noname"), "noname");
        assert_eq!(n.label("unknown"), "unknown");
    }

    #[test]
    fn test_resolve_prefers_catalog_key() {
        let catalog = WeaponCatalog::from_weapons([Weapon {
            key: "Близнец".to_string(),
            rarity: 4,
            weapon_class: "sword".to_string(),
        }]);
        assert_eq!(
            names().resolve("Близнец", &catalog),
            NameLookup::Unique("Близнец".to_string())
        );
    }

    #[test]
    fn test_load_engine_data() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let write = |rel: &str, body: &str| {
            let p = root.join(rel);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, body).unwrap();
        };
        write(
            WEAPON_DATA_PATH,
            r#"{"data":{"dullblade":{"key":"dullblade","rarity":1,"weapon_class":"sword"}}}"#,
        );
        write(
            CHAR_DATA_PATH,
            r#"{"data":{"bennett":{"key":"bennett","weapon_class":"sword"}}}"#,
        );
        write(
            NAMES_PATH,
            r#"{"Russian":{"weapon_names":{"dullblade":"Тупой меч"}}}"#,
        );

        let data = EngineData::load(root).unwrap();
        assert_eq!(data.weapons.get("dullblade").unwrap().rarity, 1);
        assert_eq!(data.characters.get("bennett").unwrap().weapon_class, "sword");
        assert_eq!(data.names.label("dullblade"), "Тупой меч");
        assert!(validate_engine_root(root.to_path_buf()).is_ok());
    }

    #[test]
    fn test_missing_locale_is_malformed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for (rel, body) in [
            (WEAPON_DATA_PATH, r#"{"data":{}}"#),
            (CHAR_DATA_PATH, r#"{"data":{}}"#),
            (NAMES_PATH, r#"{"English":{"weapon_names":{}}}"#),
        ] {
            let p = root.join(rel);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, body).unwrap();
        }
        let err = EngineData::load(root).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }
}
