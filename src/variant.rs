//! Substat optimizer variants.
//!
//! A variant is a named option bag forwarded verbatim to the optimizer,
//! plus an optional talent-level override applied to the config text.
//! Options are validated once, at construction.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::result::DEFAULT_VARIANT;

const TALENT_LEVEL_KEY: &str = "talent_level";

/// `[a-zA-Z0-9_]+`
fn is_valid_option_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Variant as written in the roster configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Map<String, Value>,
}

/// Validated optimizer options, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionBag {
    entries: BTreeMap<String, String>,
}

impl OptionBag {
    /// Validates `options` for `variant`.
    ///
    /// Keys must match `[a-zA-Z0-9_]+`. Values must be non-empty scalars
    /// without `;` or `"`.
    pub fn new<'a, I>(variant: &str, options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let mut entries = BTreeMap::new();
        for (raw_key, value) in options {
            let key = raw_key.trim();
            if !is_valid_option_key(key) {
                return Err(ConfigError::InvalidOptionKey {
                    variant: variant.to_string(),
                    key: raw_key.clone(),
                });
            }
            let invalid = |reason: &str| ConfigError::InvalidOptionValue {
                variant: variant.to_string(),
                key: key.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            };
            let text = match value {
                Value::Null => return Err(invalid("null value")),
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => return Err(invalid("must be a scalar")),
            };
            if text.is_empty() {
                return Err(invalid("empty value"));
            }
            if text.contains(';') || text.contains('"') {
                return Err(invalid("contains ';' or '\"'"));
            }
            entries.insert(key.to_string(), text);
        }
        Ok(Self { entries })
    }

    /// `key=value;key=value`, keys ascending. Empty for an empty bag.
    #[must_use]
    pub fn to_option_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstatVariant {
    pub name: String,
    pub options: OptionBag,
    /// Talent level forced on every character, in `[1..10]`.
    pub talent_level: Option<u8>,
}

impl SubstatVariant {
    /// The variant used when the configuration declares none.
    #[must_use]
    pub fn default_variant() -> Self {
        Self {
            name: DEFAULT_VARIANT.to_string(),
            options: OptionBag::default(),
            talent_level: None,
        }
    }

    /// Validates one configured variant. `talent_level` is pulled out of
    /// the options (key matched case-insensitively) and never forwarded.
    pub fn from_config(config: &VariantConfig) -> Result<Self, ConfigError> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyVariantName);
        }

        let mut talent_level = None;
        let mut forwarded = Vec::new();
        for (key, value) in &config.options {
            if key.trim().eq_ignore_ascii_case(TALENT_LEVEL_KEY) {
                talent_level = Some(parse_talent_level(name, value)?);
            } else {
                forwarded.push((key, value));
            }
        }

        Ok(Self {
            name: name.to_string(),
            options: OptionBag::new(name, forwarded)?,
            talent_level,
        })
    }
}

fn parse_talent_level(variant: &str, value: &Value) -> Result<u8, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidOptionValue {
        variant: variant.to_string(),
        key: TALENT_LEVEL_KEY.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let level: i64 = match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 => f as i64,
            _ => return Err(invalid("must be an integer")),
        },
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid("must be an integer"))?,
        _ => return Err(invalid("must be an integer")),
    };
    if !(1..=10).contains(&level) {
        return Err(ConfigError::TalentLevelOutOfRange {
            variant: variant.to_string(),
            level,
        });
    }
    Ok(level as u8)
}

/// Ordered, uniquely named variants; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSet {
    variants: Vec<SubstatVariant>,
}

impl VariantSet {
    /// Builds the set, falling back to a single `default` variant when the
    /// configuration lists none.
    pub fn from_configs(configs: &[VariantConfig]) -> Result<Self, ConfigError> {
        let variants = configs
            .iter()
            .map(SubstatVariant::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_variants(variants)
    }

    /// Checks names for uniqueness; an empty list becomes `[default]`.
    pub fn from_variants(variants: Vec<SubstatVariant>) -> Result<Self, ConfigError> {
        if variants.is_empty() {
            return Ok(Self::default());
        }
        let mut seen = HashSet::new();
        for variant in &variants {
            if !seen.insert(variant.name.as_str()) {
                return Err(ConfigError::DuplicateVariant {
                    name: variant.name.clone(),
                });
            }
        }
        Ok(Self { variants })
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubstatVariant> {
        self.variants.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl Default for VariantSet {
    fn default() -> Self {
        Self {
            variants: vec![SubstatVariant::default_variant()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(name: &str, options: Value) -> VariantConfig {
        VariantConfig {
            name: name.to_string(),
            options: options.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_option_string_sorted() {
        let v = SubstatVariant::from_config(&config(
            "v",
            json!({"fixed_substats_count": 4, "total_liquid_substats": 10, "fine_tune": 0}),
        ))
        .unwrap();
        assert_eq!(
            v.options.to_option_string(),
            "fine_tune=0;fixed_substats_count=4;total_liquid_substats=10"
        );
        assert!(v.talent_level.is_none());
    }

    #[test]
    fn test_rejects_bad_key_and_value() {
        let err = SubstatVariant::from_config(&config("v", json!({"bad-key": 1}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionKey { .. }));
        let err = SubstatVariant::from_config(&config("v", json!({"x": "1;2"}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionValue { .. }));
        let err = SubstatVariant::from_config(&config("v", json!({"x": "  "}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionValue { .. }));
        let err = SubstatVariant::from_config(&config("v", json!({"x": null}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionValue { .. }));
    }

    #[test]
    fn test_talent_level_extracted() {
        let v = SubstatVariant::from_config(&config("t9", json!({"Talent_Level": "9", "a": true})))
            .unwrap();
        assert_eq!(v.talent_level, Some(9));
        assert_eq!(v.options.to_option_string(), "a=true");

        let v = SubstatVariant::from_config(&config("t6", json!({"talent_level": 6.0}))).unwrap();
        assert_eq!(v.talent_level, Some(6));

        let err = SubstatVariant::from_config(&config("t", json!({"talent_level": 11}))).unwrap_err();
        assert!(matches!(err, ConfigError::TalentLevelOutOfRange { level: 11, .. }));
        let err = SubstatVariant::from_config(&config("t", json!({"talent_level": 2.5}))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptionValue { .. }));
    }

    #[test]
    fn test_variant_set_rules() {
        let set = VariantSet::from_configs(&[]).unwrap();
        assert_eq!(set.names(), vec![DEFAULT_VARIANT.to_string()]);

        let set = VariantSet::from_configs(&[config(" b ", json!({})), config("a", json!({}))]).unwrap();
        assert_eq!(set.names(), vec!["b".to_string(), "a".to_string()]);

        let err = VariantSet::from_configs(&[config("a", json!({})), config("a ", json!({}))]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateVariant { .. }));
        let err = VariantSet::from_configs(&[config("", json!({}))]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyVariantName));
    }
}
