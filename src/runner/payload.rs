//! Engine result JSON.
//!
//! Only the handful of fields the sweep consumes are modeled; everything
//! else in the engine output is ignored.

use serde::Deserialize;

use super::SimOutcome;
use crate::error::RunnerError;

/// Position of energy recharge in a character's stat snapshot.
pub const ER_SNAPSHOT_INDEX: usize = 7;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mean {
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub dps: Mean,
    #[serde(default)]
    pub character_dps: Vec<Mean>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterDetail {
    #[serde(default)]
    pub snapshot: Vec<f64>,
}

/// Subset of the engine's `-out` JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnginePayload {
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub character_details: Vec<CharacterDetail>,
    #[serde(default)]
    pub config_file: Option<String>,
}

fn malformed(reason: impl Into<String>) -> RunnerError {
    RunnerError::MalformedPayload {
        reason: reason.into(),
    }
}

impl EnginePayload {
    pub fn parse(bytes: &[u8]) -> Result<Self, RunnerError> {
        serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))
    }

    /// Extracts the metrics for the character at `char_index`.
    ///
    /// Means are truncated toward zero. When the engine does not echo its
    /// config, `sent_config` is recorded instead.
    pub fn into_outcome(self, char_index: usize, sent_config: &str) -> Result<SimOutcome, RunnerError> {
        let team = self
            .statistics
            .dps
            .mean
            .ok_or_else(|| malformed("missing statistics.dps.mean"))?;
        let char = self
            .statistics
            .character_dps
            .get(char_index)
            .and_then(|m| m.mean)
            .ok_or_else(|| malformed(format!("missing statistics.character_dps[{char_index}].mean")))?;
        let energy_recharge = self
            .character_details
            .get(char_index)
            .and_then(|d| d.snapshot.get(ER_SNAPSHOT_INDEX).copied())
            .ok_or_else(|| {
                malformed(format!(
                    "missing character_details[{char_index}].snapshot[{ER_SNAPSHOT_INDEX}]"
                ))
            })?;
        Ok(SimOutcome {
            team_metric: team as i64,
            char_metric: char as i64,
            energy_recharge,
            config_text: self
                .config_file
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| sent_config.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "statistics": {
            "dps": {"mean": 41234.9, "sd": 1200.0},
            "character_dps": [{"mean": 100.5}, {"mean": 22345.99}]
        },
        "character_details": [
            {"snapshot": [0, 0, 0, 0, 0, 0, 0, 1.1]},
            {"snapshot": [0, 0, 0, 0, 0, 0, 0, 1.734, 0]}
        ],
        "config_file": "engine echo",
        "extra": {"ignored": true}
    }"#;

    #[test]
    fn test_extracts_metrics() {
        let payload = EnginePayload::parse(SAMPLE.as_bytes()).unwrap();
        let outcome = payload.into_outcome(1, "sent").unwrap();
        assert_eq!(outcome.team_metric, 41234);
        assert_eq!(outcome.char_metric, 22345);
        assert_eq!(outcome.energy_recharge, 1.734);
        assert_eq!(outcome.config_text, "engine echo");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let payload = EnginePayload::parse(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            payload.into_outcome(2, "sent"),
            Err(RunnerError::MalformedPayload { .. })
        ));

        let payload = EnginePayload::parse(br#"{"statistics": {"character_dps": []}}"#).unwrap();
        let err = payload.into_outcome(0, "sent").unwrap_err();
        assert!(err.to_string().contains("statistics.dps.mean"));

        assert!(EnginePayload::parse(b"not json").is_err());
    }

    #[test]
    fn test_falls_back_to_sent_config() {
        let payload = EnginePayload::parse(
            br#"{"statistics": {"dps": {"mean": 1.0}, "character_dps": [{"mean": 1.0}]},
                 "character_details": [{"snapshot": [0,0,0,0,0,0,0,1.0]}]}"#,
        )
        .unwrap();
        assert_eq!(payload.into_outcome(0, "sent").unwrap().config_text, "sent");
    }
}
