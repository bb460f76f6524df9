//! Label assignment wire types
//!
//! A label assignment records the category values for one record together
//! with its provenance: whether the values came from the classification
//! service or from a human correction.

use crate::config::CategoryDef;
use crate::identity::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance of a label assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Predicted by the classification service
    Api,
    /// Assigned or corrected by a human
    Manual,
}

/// Category name → 0|1, in stable (sorted) key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryValues(BTreeMap<String, u8>);

impl CategoryValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (name, active) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, active)| (name.into(), u8::from(active)))
                .collect(),
        )
    }

    pub fn set(&mut self, name: impl Into<String>, active: bool) {
        self.0.insert(name.into(), u8::from(active));
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of categories with value 1, in key order
    pub fn active_categories(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, v)| **v == 1)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Check conformance to the configured closed enumeration: every
    /// configured category present, no extra keys, every value 0 or 1.
    pub fn conforms_to(&self, categories: &[CategoryDef]) -> std::result::Result<(), String> {
        for cat in categories {
            match self.0.get(&cat.name) {
                None => return Err(format!("missing category '{}'", cat.name)),
                Some(v) if *v > 1 => {
                    return Err(format!("category '{}' has value {} (expected 0 or 1)", cat.name, v))
                }
                Some(_) => {}
            }
        }
        if self.0.len() != categories.len() {
            let known: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
            let extra: Vec<&str> = self
                .0
                .keys()
                .map(String::as_str)
                .filter(|k| !known.contains(k))
                .collect();
            return Err(format!("unknown categories: {}", extra.join(", ")));
        }
        Ok(())
    }
}

/// The category values assigned to a record, tagged with provenance.
///
/// At most one assignment per record id is authoritative in the master
/// label set at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAssignment {
    pub record_id: RecordId,
    pub text_content: String,
    pub category_values: CategoryValues,
    pub source: LabelSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;

    fn categories() -> Vec<CategoryDef> {
        vec![
            CategoryDef {
                name: "billing".to_string(),
                description: String::new(),
            },
            CategoryDef {
                name: "technical".to_string(),
                description: String::new(),
            },
        ]
    }

    #[test]
    fn test_conforms_to_complete_values() {
        let values = CategoryValues::from_pairs([("billing", true), ("technical", false)]);
        assert!(values.conforms_to(&categories()).is_ok());
    }

    #[test]
    fn test_conforms_rejects_missing_category() {
        let values = CategoryValues::from_pairs([("billing", true)]);
        let err = values.conforms_to(&categories()).unwrap_err();
        assert!(err.contains("technical"));
    }

    #[test]
    fn test_conforms_rejects_unknown_category() {
        let mut values = CategoryValues::from_pairs([("billing", true), ("technical", false)]);
        values.set("spam", true);
        let err = values.conforms_to(&categories()).unwrap_err();
        assert!(err.contains("spam"));
    }

    #[test]
    fn test_conforms_rejects_out_of_range_value() {
        let json = r#"{"billing": 2, "technical": 0}"#;
        let values: CategoryValues = serde_json::from_str(json).unwrap();
        let err = values.conforms_to(&categories()).unwrap_err();
        assert!(err.contains("billing"));
    }

    #[test]
    fn test_active_categories() {
        let values = CategoryValues::from_pairs([("billing", true), ("technical", false)]);
        assert_eq!(values.active_categories(), vec!["billing"]);
    }

    #[test]
    fn test_assignment_serialization() {
        let assignment = LabelAssignment {
            record_id: identity::identify("some text"),
            text_content: "some text".to_string(),
            category_values: CategoryValues::from_pairs([("billing", true)]),
            source: LabelSource::Manual,
            model_ref: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&assignment).unwrap();
        assert!(json.contains("\"source\":\"manual\""));
        assert!(json.contains("\"billing\":1"));
        assert!(!json.contains("model_ref"));

        let parsed: LabelAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, assignment);
    }
}
