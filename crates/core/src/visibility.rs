//! Conditional sub-field visibility.
//!
//! Visibility is driven by a declarative table built from the questionnaire: each
//! question key maps to the answers that reveal its sub-questions. Every question is
//! evaluated by the same rule; changing which answer opens a follow-up is a schema edit.

use crate::answers::AnswerMap;
use crate::schema::Questionnaire;
use crate::{IntakeError, IntakeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Question key → answers that make its sub-questions visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityTable {
    rules: BTreeMap<String, Vec<String>>,
}

impl VisibilityTable {
    pub fn from_questionnaire(questionnaire: &Questionnaire) -> Self {
        let rules = questionnaire
            .questions
            .iter()
            .map(|q| (q.key.as_str().to_owned(), q.reveal_on.clone()))
            .collect();
        Self { rules }
    }

    /// Evaluates the rule for `question_key`. `None` when the key is not a question.
    pub fn evaluate(&self, question_key: &str, answer: &str) -> Option<bool> {
        self.rules
            .get(question_key)
            .map(|triggers| triggers.iter().any(|t| t == answer))
    }

    /// Recomputes visibility for every question from an answer map.
    pub fn state_for(&self, answers: &AnswerMap) -> VisibilityState {
        let mut state = VisibilityState::default();
        for (key, triggers) in &self.rules {
            if let Some(answer) = answers.get(key) {
                state.set(key.clone(), triggers.iter().any(|t| t == answer));
            }
        }
        state
    }
}

/// Question key → whether its sub-questions are shown.
///
/// Questions that were never answered are absent and read as hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityState(BTreeMap<String, bool>);

impl VisibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, question_key: &str) -> bool {
        self.0.get(question_key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, question_key: impl Into<String>, visible: bool) {
        self.0.insert(question_key.into(), visible);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Applies the table's rule for one answered question and returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::UnknownField` if `question_key` is not a question.
    pub fn update(
        &mut self,
        table: &VisibilityTable,
        question_key: &str,
        answer: &str,
    ) -> IntakeResult<bool> {
        let visible = table
            .evaluate(question_key, answer)
            .ok_or_else(|| IntakeError::UnknownField(question_key.to_string()))?;
        self.set(question_key, visible);
        Ok(visible)
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for VisibilityState {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
