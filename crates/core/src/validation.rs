//! Submission validation.
//!
//! Required-field and pattern checks run before any transcript is rendered or any network
//! call is made. All problems are collected so the form can mark every offending field
//! at once.

use crate::answers::AnswerMap;
use crate::schema::Questionnaire;
use crate::visibility::VisibilityState;
use crate::{IntakeError, IntakeResult};
use regex::Regex;
use std::fmt;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub key: String,
    pub message: String,
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldIssue>);

impl ValidationErrors {
    fn push(&mut self, key: &str, message: impl Into<String>) {
        self.0.push(FieldIssue {
            key: key.to_string(),
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `key` has at least one issue.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|i| i.key == key)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (idx, issue) in self.0.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{sep}{} ({})", issue.message, issue.key)?;
        }
        Ok(())
    }
}

/// Validates the answers of a submission against the questionnaire.
///
/// Checks, in form order:
/// - required client fields are present, within `max_length` and match their pattern
/// - every question is answered with a value from its domain
/// - every sub-question of a visible question is filled in
/// - the remarks field is present when required
///
/// # Errors
///
/// Returns `IntakeError::Validation` listing every failing field, or
/// `IntakeError::InvalidQuestionnaire` if a schema pattern does not compile.
pub fn validate_submission(
    questionnaire: &Questionnaire,
    answers: &AnswerMap,
    visibility: &VisibilityState,
) -> IntakeResult<()> {
    let mut errors = ValidationErrors::default();

    for field in &questionnaire.client_fields {
        let key = field.key.as_str();
        let value = answers.value_or_empty(key).trim();

        if value.is_empty() {
            if field.required {
                errors.push(key, format!("{} is required", field.label));
            }
            continue;
        }

        if let Some(max) = field.max_length {
            if value.chars().count() > max {
                errors.push(
                    key,
                    format!("{} must be at most {max} characters", field.label),
                );
                continue;
            }
        }

        if let Some(pattern) = &field.pattern {
            let re = Regex::new(pattern)
                .map_err(|e| IntakeError::InvalidQuestionnaire(e.to_string()))?;
            if !re.is_match(value) {
                let message = field
                    .pattern_message
                    .clone()
                    .unwrap_or_else(|| format!("{} has an invalid format", field.label));
                errors.push(key, message);
            }
        }
    }

    for question in &questionnaire.questions {
        let key = question.key.as_str();
        let domain = question.domain();

        match answers.get(key) {
            None => errors.push(key, format!("question {key} is unanswered")),
            Some(answer) if !domain.contains(answer) => errors.push(
                key,
                format!(
                    "answer '{answer}' for question {key} must be one of: {}",
                    domain.values().join(", ")
                ),
            ),
            Some(_) => {}
        }

        if visibility.is_visible(key) {
            for sub in &question.sub_questions {
                if !answers.is_filled(sub.key.as_str()) {
                    errors.push(sub.key.as_str(), format!("{} is required", sub.prompt));
                }
            }
        }
    }

    let remarks = &questionnaire.remarks;
    if remarks.required && !answers.is_filled(remarks.key.as_str()) {
        errors.push(remarks.key.as_str(), format!("{} is required", remarks.label));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(IntakeError::Validation(errors))
    }
}
