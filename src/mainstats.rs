//! Main-stat combinations.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Candidate main stats per artifact slot, as configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainStatLists {
    #[serde(default)]
    pub sands: Vec<String>,
    #[serde(default)]
    pub goblet: Vec<String>,
    #[serde(default)]
    pub circlet: Vec<String>,
}

/// Ordered `"<sands> <goblet> <circlet>"` labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainStatCombos {
    labels: Vec<String>,
}

impl MainStatCombos {
    /// Cartesian product in declaration order: sands outermost, circlet
    /// innermost. An empty product is rejected.
    pub fn build(lists: &MainStatLists) -> Result<Self, ConfigError> {
        let mut labels = Vec::with_capacity(lists.sands.len() * lists.goblet.len() * lists.circlet.len());
        for s in &lists.sands {
            for g in &lists.goblet {
                for c in &lists.circlet {
                    labels.push(format!("{} {} {}", s.trim(), g.trim(), c.trim()));
                }
            }
        }
        if labels.is_empty() {
            return Err(ConfigError::NoMainStatCombos {
                sands: lists.sands.len(),
                goblet: lists.goblet.len(),
                circlet: lists.circlet.len(),
            });
        }
        Ok(Self { labels })
    }

    /// Wraps prebuilt labels. Returns `None` for an empty list.
    #[must_use]
    pub fn from_labels(labels: Vec<String>) -> Option<Self> {
        (!labels.is_empty()).then_some(Self { labels })
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_product_order() {
        let combos = MainStatCombos::build(&MainStatLists {
            sands: v(&["atk%", "em"]),
            goblet: v(&["pyro%"]),
            circlet: v(&["cr", "cd"]),
        })
        .unwrap();
        assert_eq!(
            combos.labels(),
            &v(&["atk% pyro% cr", "atk% pyro% cd", "em pyro% cr", "em pyro% cd"])[..]
        );
    }

    #[test]
    fn test_empty_slot_is_error() {
        let err = MainStatCombos::build(&MainStatLists {
            sands: v(&["atk%"]),
            goblet: Vec::new(),
            circlet: v(&["cr"]),
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoMainStatCombos { goblet: 0, .. }));
        assert!(MainStatCombos::from_labels(Vec::new()).is_none());
    }
}
