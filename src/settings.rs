//! Roster configuration and application layout.
//!
//! The roster config is a JSON document read once at startup and validated
//! before any other component sees it. Paths are resolved relative to the
//! application root, found by walking up from the working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::{read_json, validate_engine_root};
use crate::eligibility::SourcePolicy;
use crate::error::ConfigError;
use crate::mainstats::{MainStatCombos, MainStatLists};
use crate::merge::Precedence;
use crate::target::Target;
use crate::variant::{VariantConfig, VariantSet};

/// Directory of the roster inputs, relative to the app root.
pub const INPUT_DIR: &str = "input/weapon_roster";
pub const ROSTER_CONFIG_FILE: &str = "roster_config.json";
pub const BASE_CONFIG_FILE: &str = "config.txt";
pub const EXAMPLE_ROSTER_CONFIG_FILE: &str = "examples/roster_config.example.json";
pub const EXAMPLE_BASE_CONFIG_FILE: &str = "examples/config.example.txt";
pub const SOURCES_FILE: &str = "data/weapon_sources_ru.json";
pub const OUTPUT_DIR: &str = "output/weapon_roster";
pub const WORK_DIR: &str = "work";
pub const DEFAULT_ENGINE: &str = "gcsim";

/// How many parent directories root discovery climbs.
const MAX_ROOT_DEPTH: usize = 10;

const DEFAULT_MIN_RARITY: u8 = 3;

/// Roster configuration as read from `roster_config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Engine name under `<root>/engines/`.
    pub engine: String,
    /// Explicit engine checkout; wins over `engine`.
    pub engine_path: Option<PathBuf>,
    #[serde(rename = "char")]
    pub character: String,
    pub roster_name: String,
    pub target: Vec<String>,
    /// 0 means the default of 3.
    pub minimum_weapon_rarity: u8,
    /// Explicit `"<name> [refine...]"` entries. Empty runs every eligible weapon.
    pub weapons: Vec<String>,
    pub main_stats: MainStatLists,
    pub substat_optimizer_variants: Vec<VariantConfig>,
    pub skip_existing_results: bool,
    pub keep_better_results: bool,
    pub output_table_path: Option<String>,
    pub base_table_path: Option<String>,
    /// Overrides the built-in source vocabulary.
    pub acquisition_sources: Option<SourcePolicy>,
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl RosterConfig {
    /// Reads and validates a roster config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = read_json(path)?;
        config.validate()
    }

    /// Checks required fields and normalizes defaults.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.character = self.character.trim().to_string();
        if self.character.is_empty() {
            return Err(invalid("char", "must not be empty"));
        }
        self.roster_name = self.roster_name.trim().to_string();
        if self.roster_name.is_empty() {
            return Err(invalid("roster_name", "must not be empty"));
        }
        if self.minimum_weapon_rarity == 0 {
            self.minimum_weapon_rarity = DEFAULT_MIN_RARITY;
        }
        if self.minimum_weapon_rarity > 5 {
            return Err(invalid(
                "minimum_weapon_rarity",
                format!("must be in [1..5], got {}", self.minimum_weapon_rarity),
            ));
        }
        if let Some(policy) = &self.acquisition_sources {
            if let Some(tag) = policy.limited.iter().find(|t| !policy.allowed.contains(*t)) {
                return Err(invalid(
                    "acquisition_sources.limited",
                    format!("'{tag}' is not in acquisition_sources.allowed"),
                ));
            }
        }
        Ok(self)
    }

    pub fn target(&self) -> Result<Target, ConfigError> {
        Target::parse(&self.target)
    }

    pub fn variants(&self) -> Result<VariantSet, ConfigError> {
        VariantSet::from_configs(&self.substat_optimizer_variants)
    }

    pub fn combos(&self) -> Result<MainStatCombos, ConfigError> {
        MainStatCombos::build(&self.main_stats)
    }

    #[must_use]
    pub fn source_policy(&self) -> SourcePolicy {
        self.acquisition_sources.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn precedence(&self, target: Target) -> Precedence {
        if self.keep_better_results {
            Precedence::KeepBetter(target)
        } else {
            Precedence::ComputedWins
        }
    }
}

/// Filesystem layout below the application root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    /// Read the bundled example inputs instead of the operator's.
    pub use_examples: bool,
}

impl AppPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, use_examples: bool) -> Self {
        Self {
            root: root.into(),
            use_examples,
        }
    }

    /// Walks up from `start` looking for `input/weapon_roster/roster_config.json`.
    ///
    /// Starting inside `input/weapon_roster` itself also resolves to the
    /// root two levels up.
    pub fn discover(start: &Path, use_examples: bool) -> Result<Self, ConfigError> {
        let mut dir = start;
        for _ in 0..MAX_ROOT_DEPTH {
            if dir.join(INPUT_DIR).join(ROSTER_CONFIG_FILE).is_file() {
                return Ok(Self::new(dir, use_examples));
            }
            if dir.join(ROSTER_CONFIG_FILE).is_file() && dir.ends_with(INPUT_DIR) {
                if let Some(root) = dir.parent().and_then(Path::parent) {
                    return Ok(Self::new(root, use_examples));
                }
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        Err(ConfigError::RootNotFound {
            start: start.to_path_buf(),
        })
    }

    fn input(&self, file: &str) -> PathBuf {
        self.root.join(INPUT_DIR).join(file)
    }

    #[must_use]
    pub fn roster_config(&self) -> PathBuf {
        if self.use_examples {
            self.input(EXAMPLE_ROSTER_CONFIG_FILE)
        } else {
            self.input(ROSTER_CONFIG_FILE)
        }
    }

    /// Simulation config the sweep edits.
    #[must_use]
    pub fn base_config(&self) -> PathBuf {
        if self.use_examples {
            self.input(EXAMPLE_BASE_CONFIG_FILE)
        } else {
            self.input(BASE_CONFIG_FILE)
        }
    }

    #[must_use]
    pub fn sources(&self) -> PathBuf {
        self.root.join(SOURCES_FILE)
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR)
    }

    /// `engine_path` if set, else `<root>/engines/<engine>`. Either must
    /// contain the engine's generated data.
    pub fn engine_root(&self, config: &RosterConfig) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &config.engine_path {
            if !path.as_os_str().is_empty() {
                return validate_engine_root(self.resolve(path));
            }
        }
        let engine = match config.engine.trim() {
            "" => DEFAULT_ENGINE,
            name => name,
        };
        validate_engine_root(self.root.join("engines").join(engine))
    }

    /// Absolute paths pass through; relative ones hang off the root.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// `<YYYYMMDD>_weapon_roster_<char>_<roster>.json`
#[must_use]
pub fn artifact_file_name(date: NaiveDate, character: &str, roster_name: &str) -> String {
    format!("{}_weapon_roster_{character}_{roster_name}.json", date.format("%Y%m%d"))
}

/// Newest of `date`'s artifacts for this character and roster in `dir`.
///
/// Names carry a date prefix, so the lexicographic maximum is the newest.
pub fn find_existing_result_table(
    dir: &Path,
    character: &str,
    roster_name: &str,
    date: NaiveDate,
) -> Result<Option<PathBuf>, ConfigError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Unreadable {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })
        }
    };
    let prefix = date.format("%Y%m%d").to_string();
    let suffix = format!("_weapon_roster_{character}_{roster_name}.json");

    let mut newest: Option<PathBuf> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(&prefix) || !name.ends_with(&suffix) {
            continue;
        }
        if newest.as_ref().map_or(true, |n| path > *n) {
            newest = Some(path);
        }
    }
    Ok(newest)
}

/// Where a sweep writes its table and which table it resumes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub output: PathBuf,
    pub base: Option<PathBuf>,
}

/// Resolves output and base paths.
///
/// With neither configured, today's newest artifact becomes the base and the
/// output gets today's default name. An explicit output that already exists
/// becomes the base unless a base is given.
pub fn resolve_table_paths(
    paths: &AppPaths,
    config: &RosterConfig,
    today: NaiveDate,
) -> Result<TablePaths, ConfigError> {
    let raw_output = non_blank(config.output_table_path.as_ref());
    let raw_base = non_blank(config.base_table_path.as_ref());
    let default_output = || {
        paths
            .output_dir()
            .join(artifact_file_name(today, &config.character, &config.roster_name))
    };

    let resolved = match (raw_output, raw_base) {
        (None, None) => TablePaths {
            output: default_output(),
            base: find_existing_result_table(
                &paths.output_dir(),
                &config.character,
                &config.roster_name,
                today,
            )?,
        },
        (Some(output), base) => {
            let output = paths.resolve(output);
            let base = match base {
                Some(b) => Some(paths.resolve(b)),
                None => output.is_file().then(|| output.clone()),
            };
            TablePaths { output, base }
        }
        (None, Some(base)) => TablePaths {
            output: default_output(),
            base: Some(paths.resolve(base)),
        },
    };
    debug!(output = %resolved.output.display(), base = ?resolved.base, "resolved table paths");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(json: &str) -> RosterConfig {
        serde_json::from_str::<RosterConfig>(json).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let cfg = config(r#"{"char": " diluc ", "roster_name": "r1"}"#).validate().unwrap();
        assert_eq!(cfg.character, "diluc");
        assert_eq!(cfg.minimum_weapon_rarity, 3);
        assert_eq!(cfg.target().unwrap(), Target::CharDps);
        assert_eq!(cfg.variants().unwrap().names(), vec!["default".to_string()]);
        assert_eq!(cfg.source_policy(), SourcePolicy::default());
        assert_eq!(cfg.precedence(Target::TeamDps), Precedence::ComputedWins);
        assert!(cfg.combos().is_err());

        assert!(config(r#"{"roster_name": "r1"}"#).validate().is_err());
        assert!(config(r#"{"char": "x", "roster_name": "r", "minimum_weapon_rarity": 6}"#)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_full_document() {
        let cfg = config(
            r#"{
                "engine": "wfpsim",
                "char": "xiangling",
                "roster_name": "national",
                "target": ["team_dps"],
                "minimum_weapon_rarity": 4,
                "weapons": ["thecatch 1 5", "Драконий рык"],
                "main_stats": {"sands": ["er", "em"], "goblet": ["pyro%"], "circlet": ["cr", "cd"]},
                "substat_optimizer_variants": [
                    {"name": "fixed", "options": {"total_liquid_substats": 20, "talent_level": 9}}
                ],
                "keep_better_results": true,
                "acquisition_sources": {"allowed": ["Ковка", "БП"], "limited": ["БП"]}
            }"#,
        )
        .validate()
        .unwrap();
        assert_eq!(cfg.target().unwrap(), Target::TeamDps);
        assert_eq!(cfg.combos().unwrap().len(), 4);
        let variants = cfg.variants().unwrap();
        let fixed = variants.iter().next().unwrap();
        assert_eq!(fixed.talent_level, Some(9));
        assert_eq!(fixed.options.to_option_string(), "total_liquid_substats=20");
        assert_eq!(cfg.precedence(Target::TeamDps), Precedence::KeepBetter(Target::TeamDps));
        assert!(cfg.source_policy().limited.contains("БП"));
    }

    #[test]
    fn test_limited_must_be_allowed() {
        let err = config(
            r#"{"char": "x", "roster_name": "r",
                "acquisition_sources": {"allowed": ["Ковка"], "limited": ["БП"]}}"#,
        )
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("БП"));
    }

    #[test]
    fn test_discover_root() {
        let dir = tempdir().unwrap();
        let input = dir.path().join(INPUT_DIR);
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join(ROSTER_CONFIG_FILE), "{}").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(AppPaths::discover(&nested, false).unwrap().root, dir.path());
        assert_eq!(AppPaths::discover(&input, false).unwrap().root, dir.path());

        let other = tempdir().unwrap();
        assert!(matches!(
            AppPaths::discover(other.path(), false),
            Err(ConfigError::RootNotFound { .. })
        ));
    }

    #[test]
    fn test_paths_and_examples() {
        let paths = AppPaths::new("/app", true);
        assert!(paths.roster_config().ends_with("input/weapon_roster/examples/roster_config.example.json"));
        assert!(paths.base_config().ends_with("examples/config.example.txt"));
        assert_eq!(paths.sources(), Path::new("/app/data/weapon_sources_ru.json"));
        assert_eq!(paths.resolve("/abs/x.json"), Path::new("/abs/x.json"));
        assert_eq!(paths.resolve("rel/x.json"), Path::new("/app/rel/x.json"));
    }

    #[test]
    fn test_engine_root_validation() {
        let dir = tempdir().unwrap();
        let paths = AppPaths::new(dir.path(), false);
        let cfg = config(r#"{"char": "x", "roster_name": "r"}"#);
        assert!(matches!(
            paths.engine_root(&cfg),
            Err(ConfigError::InvalidEngineRoot { .. })
        ));

        let engine = dir.path().join("engines").join("gcsim");
        let probe = engine.join(crate::catalog::WEAPON_DATA_PATH);
        fs::create_dir_all(probe.parent().unwrap()).unwrap();
        fs::write(&probe, "{}").unwrap();
        assert_eq!(paths.engine_root(&cfg).unwrap(), engine);
    }

    #[test]
    fn test_find_existing_result_table() {
        let dir = tempdir().unwrap();
        assert_eq!(
            find_existing_result_table(&dir.path().join("missing"), "diluc", "r", date()).unwrap(),
            None
        );
        for name in [
            "20240309_weapon_roster_diluc_r.json",
            "20240309b_weapon_roster_diluc_r.json",
            "20240308_weapon_roster_diluc_r.json",
            "20240309_weapon_roster_xq_r.json",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let found = find_existing_result_table(dir.path(), "diluc", "r", date()).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "20240309b_weapon_roster_diluc_r.json");
    }

    #[test]
    fn test_resolve_table_paths() {
        let dir = tempdir().unwrap();
        let paths = AppPaths::new(dir.path(), false);
        let mut cfg = config(r#"{"char": "diluc", "roster_name": "r"}"#);

        let resolved = resolve_table_paths(&paths, &cfg, date()).unwrap();
        assert_eq!(
            resolved.output,
            paths.output_dir().join("20240309_weapon_roster_diluc_r.json")
        );
        assert_eq!(resolved.base, None);

        fs::create_dir_all(paths.output_dir()).unwrap();
        fs::write(&resolved.output, "{}").unwrap();
        let again = resolve_table_paths(&paths, &cfg, date()).unwrap();
        assert_eq!(again.base.as_ref(), Some(&resolved.output));

        cfg.output_table_path = Some("custom.json".to_string());
        let custom = resolve_table_paths(&paths, &cfg, date()).unwrap();
        assert_eq!(custom.output, dir.path().join("custom.json"));
        assert_eq!(custom.base, None);

        fs::write(dir.path().join("custom.json"), "{}").unwrap();
        let custom = resolve_table_paths(&paths, &cfg, date()).unwrap();
        assert_eq!(custom.base, Some(dir.path().join("custom.json")));

        cfg.base_table_path = Some("  old.json ".to_string());
        let custom = resolve_table_paths(&paths, &cfg, date()).unwrap();
        assert_eq!(custom.base, Some(dir.path().join("old.json")));
    }
}
