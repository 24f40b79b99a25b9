//! Error types for weapon-roster.
//!
//! Errors are strongly typed using thiserror, one enum per failure class:
//! configuration problems, missing data, simulation runner failures and
//! result store I/O. Cancellation is a runner outcome, not a failure, and is
//! kept as its own variant so callers can tell "stop and export" apart from
//! "abort".

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors. Always fatal, raised before any simulation runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported target {given:?} (supported: team_dps, char_dps, personal_dps)")]
    UnknownTarget {
        given: Vec<String>,
    },

    #[error("Substat optimizer variant name cannot be empty")]
    EmptyVariantName,

    #[error("Duplicate substat optimizer variant name '{name}'")]
    DuplicateVariant {
        name: String,
    },

    #[error("Variant '{variant}': option key '{key}' is invalid (allowed: [a-zA-Z0-9_])")]
    InvalidOptionKey {
        variant: String,
        key: String,
    },

    #[error("Variant '{variant}': option '{key}' has unsupported value {value:?}: {reason}")]
    InvalidOptionValue {
        variant: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Variant '{variant}': talent_level must be in [1..10], got {level}")]
    TalentLevelOutOfRange {
        variant: String,
        level: i64,
    },

    #[error("Refine must be in [1..5], got {refine} in '{entry}'")]
    InvalidRefine {
        entry: String,
        refine: i64,
    },

    #[error("Weapon entry is malformed: '{entry}'")]
    MalformedWeaponEntry {
        entry: String,
    },

    #[error("Unknown weapon keys or display names (strict full match): {}", .names.join(", "))]
    UnknownWeapons {
        names: Vec<String>,
    },

    #[error("Ambiguous weapon display name '{name}' (matches {})", .keys.join(", "))]
    AmbiguousWeaponName {
        name: String,
        keys: Vec<String>,
    },

    #[error("Weapons not compatible with {character} (class={weapon_class}): {}", .weapons.join(", "))]
    IncompatibleWeapons {
        character: String,
        weapon_class: String,
        weapons: Vec<String>,
    },

    #[error("Character '{character}' not found in simulation config")]
    CharacterNotInConfig {
        character: String,
    },

    #[error("Character '{character}' not found in character catalog")]
    CharacterNotInCatalog {
        character: String,
    },

    #[error("Acquisition sources: weapon '{weapon}' has unsupported source '{source_tag}'")]
    UnsupportedSource {
        weapon: String,
        source_tag: String,
    },

    #[error("Main stat lists produce no combinations (sands={sands}, goblet={goblet}, circlet={circlet})")]
    NoMainStatCombos {
        sands: usize,
        goblet: usize,
        circlet: usize,
    },

    #[error("Cannot read {}: {message}", .path.display())]
    Unreadable {
        path: PathBuf,
        message: String,
    },

    #[error("Cannot parse {}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        reason: String,
    },

    #[error("Engine root is invalid: {reason}")]
    InvalidEngineRoot {
        reason: String,
    },

    #[error("Roster config field '{field}' is invalid: {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },

    #[error("Cannot find app root from {} (expected input/weapon_roster/roster_config.json in it or a parent)", .start.display())]
    RootNotFound {
        start: PathBuf,
    },
}

/// Missing-data errors: a contract violation between components.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Weapon '{weapon}' not found in weapon catalog")]
    WeaponNotInCatalog {
        weapon: String,
    },

    #[error("{anchor} for character '{character}' not found in config")]
    AnchorNotFound {
        anchor: String,
        character: String,
    },

    #[error("Main stats must have exactly 3 tokens, got {count}: {main_stats:?}")]
    InvalidMainStats {
        main_stats: String,
        count: usize,
    },

    #[error("Talent level must be in [1..10], got {level}")]
    TalentLevelOutOfRange {
        level: u8,
    },
}

/// Errors surfaced by the external simulation runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The run was interrupted on request. Not a failure.
    #[error("Simulation canceled")]
    Canceled,

    #[error("Engine process failed: {message}")]
    ProcessFailed {
        message: String,
    },

    #[error("Engine result is malformed: {reason}")]
    MalformedPayload {
        reason: String,
    },

    #[error("Runner I/O error at {}: {message}", .path.display())]
    Io {
        path: PathBuf,
        message: String,
    },
}

/// Result artifact errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Result table I/O error at {}: {message}", .path.display())]
    Io {
        path: PathBuf,
        message: String,
    },

    #[error("Result table {} is not a workbook: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        reason: String,
    },

    #[error("Result table {} has neither 'Results+Config' nor 'Results' sheet", .path.display())]
    MissingSheet {
        path: PathBuf,
    },

    #[error("Output directory {} is locked by another sweep", .path.display())]
    Locked {
        path: PathBuf,
    },
}

/// Top-level error type for weapon-roster.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing data: {0}")]
    Data(#[from] DataError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl RosterError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a missing-data error.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Returns true if this is a runner error other than cancellation.
    #[must_use]
    pub const fn is_runner_failure(&self) -> bool {
        matches!(self, Self::Runner(e) if !matches!(e, RunnerError::Canceled))
    }

    /// Returns true if this error only reports a cancellation.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Runner(RunnerError::Canceled))
    }
}

impl RunnerError {
    /// Returns true if this is the cancellation signal.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Result type alias for weapon-roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_target_lists_input() {
        let err = ConfigError::UnknownTarget {
            given: vec!["burst_dps".to_string()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("burst_dps"));
        assert!(msg.contains("team_dps"));
    }

    #[test]
    fn test_unknown_weapons_joined() {
        let err = ConfigError::UnknownWeapons {
            names: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().ends_with("a, b"));
    }

    #[test]
    fn test_anchor_not_found() {
        let err = DataError::AnchorNotFound {
            anchor: "weapon line".to_string(),
            character: "xiangling".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("weapon line"));
        assert!(msg.contains("xiangling"));
    }

    #[test]
    fn test_roster_error_from_config() {
        let err: RosterError = ConfigError::EmptyVariantName.into();
        assert!(err.is_config());
        assert!(!err.is_canceled());
        assert!(!err.is_runner_failure());
    }

    #[test]
    fn test_cancel_is_not_a_runner_failure() {
        let err: RosterError = RunnerError::Canceled.into();
        assert!(err.is_canceled());
        assert!(!err.is_runner_failure());

        let err: RosterError = RunnerError::ProcessFailed {
            message: "exit status 2".to_string(),
        }
        .into();
        assert!(err.is_runner_failure());
        assert!(!err.is_canceled());
    }

    #[test]
    fn test_internal() {
        let err = RosterError::internal("unexpected state");
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
        assert!(!err.is_data());
    }
}
