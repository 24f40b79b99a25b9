//! Optimization target and comparison rules.
//!
//! Comparisons are strict: a candidate replaces the incumbent only when it
//! scores higher, so the first-seen result wins ties.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::result::CellResult;

/// The scalar used to compare candidate builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Throughput of the optimized character alone.
    #[default]
    CharDps,
    /// Throughput of the whole team.
    TeamDps,
}

impl Target {
    /// Resolves the configured target list.
    ///
    /// An empty list means `CharDps`. `team_dps` anywhere in the list wins;
    /// otherwise `char_dps` or `personal_dps` select `CharDps`.
    pub fn parse(target: &[String]) -> Result<Self, ConfigError> {
        if target.is_empty() {
            return Ok(Self::CharDps);
        }
        let names: Vec<&str> = target.iter().map(|t| t.trim()).collect();
        if names.contains(&"team_dps") {
            return Ok(Self::TeamDps);
        }
        if names.iter().any(|t| *t == "char_dps" || *t == "personal_dps") {
            return Ok(Self::CharDps);
        }
        Err(ConfigError::UnknownTarget {
            given: target.to_vec(),
        })
    }

    /// The metric this target optimizes.
    #[must_use]
    pub const fn metric(self, result: &CellResult) -> i64 {
        match self {
            Self::TeamDps => result.team_metric,
            Self::CharDps => result.char_metric,
        }
    }

    /// True if `candidate` strictly beats `incumbent`.
    #[must_use]
    pub const fn is_better(self, candidate: &CellResult, incumbent: &CellResult) -> bool {
        self.metric(candidate) > self.metric(incumbent)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TeamDps => "team_dps",
            Self::CharDps => "char_dps",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(team: i64, ch: i64) -> CellResult {
        CellResult {
            team_metric: team,
            char_metric: ch,
            energy_recharge: 1.0,
            main_stats: String::new(),
            config: String::new(),
        }
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_defaults_to_char() {
        assert_eq!(Target::parse(&[]).unwrap(), Target::CharDps);
    }

    #[test]
    fn test_parse_team_wins() {
        assert_eq!(Target::parse(&names(&["char_dps", "team_dps"])).unwrap(), Target::TeamDps);
        assert_eq!(Target::parse(&names(&["personal_dps"])).unwrap(), Target::CharDps);
    }

    #[test]
    fn test_parse_unknown_is_error() {
        let err = Target::parse(&names(&["burst"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTarget { .. }));
    }

    #[test]
    fn test_is_better_is_strict() {
        let a = r(100, 50);
        let b = r(100, 60);
        assert!(!Target::TeamDps.is_better(&b, &a));
        assert!(Target::CharDps.is_better(&b, &a));
        assert!(!Target::CharDps.is_better(&a, &a));
    }
}
