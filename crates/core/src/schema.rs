//! Questionnaire schema.
//!
//! A questionnaire is supplied as YAML and describes everything the form and the
//! transcript need: client fields, the ordered diagnostic questions with their follow-up
//! sub-questions, the remarks field and the document titles. Controller, visibility and
//! renderer are generic over this schema; no question key is special-cased in code.
//!
//! Two schemas are bundled: `transmissao` (the default, numbered questions) and `fluido`.

use crate::constants::{DEFAULT_QUESTIONNAIRE, NO, YES};
use crate::{IntakeError, IntakeResult};
use intake_types::{FieldKey, NonEmptyText};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const TRANSMISSAO_YAML: &str = include_str!("../schemas/transmissao.yaml");
const FLUIDO_YAML: &str = include_str!("../schemas/fluido.yaml");

/// Names of the bundled questionnaires.
pub const BUILTIN_QUESTIONNAIRES: &[&str] = &["transmissao", "fluido"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: FieldKey,
    pub title: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Heading printed on the transcript.
    pub transcript_title: NonEmptyText,
    /// Heading of the client information block on the transcript.
    pub client_section: String,
    pub client_fields: Vec<ClientField>,
    pub questions: Vec<Question>,
    pub remarks: RemarksField,
}

/// A free-text client/vehicle field such as the customer name or plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientField {
    pub key: FieldKey,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_label: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    /// Anchored regular expression the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Values are upper-cased as they are entered.
    #[serde(default)]
    pub uppercase: bool,
}

impl ClientField {
    pub fn transcript_label(&self) -> &str {
        self.transcript_label.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub key: FieldKey,
    pub prompt: NonEmptyText,
    /// Illustrative image shown next to the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_questions: Vec<SubQuestion>,
    /// Enumerated answers. Absent means a `Sim`/`Não` question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Answers that reveal the sub-questions.
    #[serde(default = "default_reveal_on")]
    pub reveal_on: Vec<String>,
}

impl Question {
    pub fn domain(&self) -> AnswerDomain<'_> {
        match &self.options {
            Some(options) => AnswerDomain::Options(options),
            None => AnswerDomain::YesNo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub key: FieldKey,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_label: Option<String>,
}

impl SubQuestion {
    pub fn transcript_label(&self) -> &str {
        self.transcript_label.as_deref().unwrap_or(&self.prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemarksField {
    pub key: FieldKey,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_label: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl RemarksField {
    pub fn transcript_label(&self) -> &str {
        self.transcript_label.as_deref().unwrap_or(&self.label)
    }
}

/// Set of acceptable answers for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerDomain<'a> {
    YesNo,
    Options(&'a [String]),
}

impl AnswerDomain<'_> {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            AnswerDomain::YesNo => value == YES || value == NO,
            AnswerDomain::Options(options) => options.iter().any(|o| o == value),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            AnswerDomain::YesNo => vec![NO, YES],
            AnswerDomain::Options(options) => options.iter().map(String::as_str).collect(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reveal_on() -> Vec<String> {
    vec![YES.to_string()]
}

/// Where a key lives within the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Client(&'a ClientField),
    Question(&'a Question),
    SubQuestion {
        question: &'a Question,
        sub: &'a SubQuestion,
    },
    Remarks(&'a RemarksField),
}

impl Questionnaire {
    /// Parses and checks a questionnaire from YAML.
    pub fn from_yaml_str(yaml: &str) -> IntakeResult<Self> {
        let questionnaire: Questionnaire =
            serde_yaml::from_str(yaml).map_err(IntakeError::YamlDeserialization)?;
        questionnaire.check()?;
        Ok(questionnaire)
    }

    /// Reads a questionnaire file.
    pub fn from_path(path: &Path) -> IntakeResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(IntakeError::FileRead)?;
        Self::from_yaml_str(&yaml)
    }

    /// Returns one of the bundled questionnaires by name.
    pub fn builtin(name: &str) -> IntakeResult<Self> {
        let yaml = match name {
            "transmissao" => TRANSMISSAO_YAML,
            "fluido" => FLUIDO_YAML,
            other => return Err(IntakeError::UnknownQuestionnaire(other.to_string())),
        };
        Self::from_yaml_str(yaml)
    }

    pub fn default_builtin() -> IntakeResult<Self> {
        Self::builtin(DEFAULT_QUESTIONNAIRE)
    }

    pub fn question(&self, key: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.key.as_str() == key)
    }

    pub fn client_field(&self, key: &str) -> Option<&ClientField> {
        self.client_fields.iter().find(|f| f.key.as_str() == key)
    }

    /// Resolves any field key of the questionnaire.
    pub fn field(&self, key: &str) -> Option<FieldRef<'_>> {
        if let Some(field) = self.client_field(key) {
            return Some(FieldRef::Client(field));
        }
        if self.remarks.key.as_str() == key {
            return Some(FieldRef::Remarks(&self.remarks));
        }
        for question in &self.questions {
            if question.key.as_str() == key {
                return Some(FieldRef::Question(question));
            }
            if let Some(sub) = question.sub_questions.iter().find(|s| s.key.as_str() == key) {
                return Some(FieldRef::SubQuestion { question, sub });
            }
        }
        None
    }

    /// Structural checks applied on load.
    ///
    /// Keys are unique across the whole form, patterns compile, option lists are
    /// non-empty and every trigger answer belongs to its question's domain.
    pub fn check(&self) -> IntakeResult<()> {
        if self.questions.is_empty() {
            return Err(IntakeError::InvalidQuestionnaire(
                "questionnaire has no questions".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        let mut claim = |key: &FieldKey| -> IntakeResult<()> {
            if !seen.insert(key.as_str().to_owned()) {
                return Err(IntakeError::InvalidQuestionnaire(format!(
                    "duplicate field key: {key}"
                )));
            }
            Ok(())
        };

        for field in &self.client_fields {
            claim(&field.key)?;
            if let Some(pattern) = &field.pattern {
                Regex::new(pattern).map_err(|e| {
                    IntakeError::InvalidQuestionnaire(format!(
                        "invalid pattern for {}: {e}",
                        field.key
                    ))
                })?;
            }
        }
        claim(&self.remarks.key)?;

        for question in &self.questions {
            claim(&question.key)?;
            if matches!(&question.options, Some(options) if options.is_empty()) {
                return Err(IntakeError::InvalidQuestionnaire(format!(
                    "question {} has an empty option list",
                    question.key
                )));
            }

            let domain = question.domain();
            if let Some(trigger) = question.reveal_on.iter().find(|t| !domain.contains(t)) {
                return Err(IntakeError::InvalidQuestionnaire(format!(
                    "question {} reveals on '{trigger}', which is not one of its answers",
                    question.key
                )));
            }
            if !question.sub_questions.is_empty() && question.reveal_on.is_empty() {
                return Err(IntakeError::InvalidQuestionnaire(format!(
                    "question {} has sub-questions that can never be shown",
                    question.key
                )));
            }

            for sub in &question.sub_questions {
                claim(&sub.key)?;
            }
        }

        Ok(())
    }
}
