//! Artifact metadata sheet.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::workbook::Sheet;

pub const META_SHEET: &str = "Meta";

/// Identifies the sweep that produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub character: String,
    pub roster_name: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
    /// blake3 hex digest of the base simulation config text.
    pub config_fingerprint: String,
}

/// blake3 digest of a configuration text, lowercase hex.
#[must_use]
pub fn fingerprint(config_text: &str) -> String {
    blake3::hash(config_text.as_bytes()).to_hex().to_string()
}

impl ArtifactMeta {
    #[must_use]
    pub fn new(character: &str, roster_name: &str, target: &str, config_text: &str) -> Self {
        Self {
            character: character.to_string(),
            roster_name: roster_name.to_string(),
            target: target.to_string(),
            created_at: Utc::now(),
            config_fingerprint: fingerprint(config_text),
        }
    }

    pub(crate) fn to_sheet(&self) -> Sheet {
        let mut sheet = Sheet::new(META_SHEET);
        let created_at = self.created_at.to_rfc3339();
        let pairs = [
            ("character", self.character.as_str()),
            ("roster_name", self.roster_name.as_str()),
            ("target", self.target.as_str()),
            ("created_at", created_at.as_str()),
            ("config_fingerprint", self.config_fingerprint.as_str()),
        ];
        for (row, (key, value)) in pairs.iter().enumerate() {
            sheet.set(row, 0, *key);
            sheet.set(row, 1, *value);
        }
        sheet
    }

    /// Reads the key/value rows back. Returns `None` if any field is absent
    /// or the timestamp does not parse.
    pub(crate) fn from_sheet(sheet: &Sheet) -> Option<Self> {
        let value = |key: &str| {
            (0..sheet.row_count())
                .find(|row| sheet.text(*row, 0).as_deref() == Some(key))
                .and_then(|row| sheet.text(row, 1))
        };
        let created_raw = value("created_at")?;
        let created_at = match DateTime::parse_from_rfc3339(&created_raw) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(value = %created_raw, error = %e, "ignoring unparsable artifact timestamp");
                return None;
            }
        };
        Some(Self {
            character: value("character")?,
            roster_name: value("roster_name")?,
            target: value("target")?,
            created_at,
            config_fingerprint: value("config_fingerprint")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint("xiangling char lvl=90/90;");
        assert_eq!(a, fingerprint("xiangling char lvl=90/90;"));
        assert_ne!(a, fingerprint("xiangling char lvl=80/90;"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_sheet_roundtrip() {
        let meta = ArtifactMeta::new("xiangling", "vape", "team_dps", "cfg");
        let back = ArtifactMeta::from_sheet(&meta.to_sheet()).unwrap();
        assert_eq!(back.character, "xiangling");
        assert_eq!(back.config_fingerprint, meta.config_fingerprint);
        assert_eq!(back.created_at.timestamp(), meta.created_at.timestamp());
    }

    #[test]
    fn test_incomplete_sheet_is_none() {
        let mut sheet = Sheet::new(META_SHEET);
        sheet.set(0, 0, "character");
        sheet.set(0, 1, "xiangling");
        assert!(ArtifactMeta::from_sheet(&sheet).is_none());
    }
}
