//! Answer map.
//!
//! Flat mapping from field key to the submitted string, populated as the form is filled
//! in. Entries are only ever added or replaced until the controller resets after a
//! successful submission.

use crate::schema::{FieldRef, Questionnaire};
use crate::visibility::VisibilityState;
use crate::{IntakeError, IntakeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, String>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value, replacing any earlier value for the same key.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key`, or the empty string when nothing was entered.
    pub fn value_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// True when the key holds a value with at least one non-whitespace character.
    pub fn is_filled(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// JSON object sent to the relay as submission metadata.
    ///
    /// A sub-question's value is only included while its parent question is visible, the
    /// same rule the transcript applies.
    pub fn to_visible_metadata(
        &self,
        questionnaire: &Questionnaire,
        visibility: &VisibilityState,
    ) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .filter(|(k, _)| match questionnaire.field(k) {
                    Some(FieldRef::SubQuestion { question, .. }) => {
                        visibility.is_visible(question.key.as_str())
                    }
                    _ => true,
                })
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }

    /// Loads a flat JSON object of answers.
    ///
    /// Non-string scalars (numbers, booleans) are accepted and stored in their JSON text
    /// form, so `{"kmUltimaTroca": 80000}` works the same as the quoted value.
    pub fn from_json_str(json: &str) -> IntakeResult<Self> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(IntakeError::Deserialization)?;

        let mut answers = AnswerMap::new();
        for (key, value) in raw {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => continue,
                _ => {
                    return Err(IntakeError::InvalidInput(format!(
                        "answer for {key} must be a scalar"
                    )))
                }
            };
            answers.record(key, value);
        }
        Ok(answers)
    }

    pub fn from_json_path(path: &Path) -> IntakeResult<Self> {
        let json = std::fs::read_to_string(path).map_err(IntakeError::FileRead)?;
        Self::from_json_str(&json)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut answers = AnswerMap::new();
        for (k, v) in iter {
            answers.record(k, v);
        }
        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_replaces_previous_value() {
        let mut answers = AnswerMap::new();
        answers.record("fluido", "Não");
        answers.record("fluido", "Sim");
        assert_eq!(answers.get("fluido"), Some("Sim"));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn is_filled_ignores_whitespace() {
        let answers: AnswerMap = [("a", "  "), ("b", "x")].into_iter().collect();
        assert!(!answers.is_filled("a"));
        assert!(answers.is_filled("b"));
        assert!(!answers.is_filled("c"));
    }

    #[test]
    fn from_json_accepts_numbers_and_skips_null() {
        let answers =
            AnswerMap::from_json_str(r#"{"kmUltimaTroca": 80000, "fluido": "Sim", "x": null}"#)
                .unwrap();
        assert_eq!(answers.get("kmUltimaTroca"), Some("80000"));
        assert_eq!(answers.get("fluido"), Some("Sim"));
        assert!(answers.get("x").is_none());
    }

    #[test]
    fn from_json_rejects_nested_values() {
        let err = AnswerMap::from_json_str(r#"{"a": {"b": 1}}"#).expect_err("nested");
        assert!(matches!(err, IntakeError::InvalidInput(msg) if msg.contains("scalar")));
    }

    #[test]
    fn visible_metadata_drops_hidden_follow_ups() {
        let q = Questionnaire::builtin("fluido").unwrap();
        let answers: AnswerMap = [
            ("placa", "ABC1D23"),
            ("fluido", "Não"),
            ("kmUltimaTroca", "80000"),
        ]
        .into_iter()
        .collect();

        let hidden: VisibilityState = [("fluido", false)].into_iter().collect();
        assert_eq!(
            answers.to_visible_metadata(&q, &hidden),
            serde_json::json!({ "placa": "ABC1D23", "fluido": "Não" })
        );

        let shown: VisibilityState = [("fluido", true)].into_iter().collect();
        let metadata = answers.to_visible_metadata(&q, &shown);
        assert_eq!(metadata["kmUltimaTroca"], "80000");
    }
}
