//! Client runtime configuration.
//!
//! Resolved once at process startup from the environment (or CLI flags) and then passed
//! into the controller. Nothing in this crate reads environment variables while a form
//! is being filled in or submitted.

use crate::constants::{DEFAULT_QUESTIONNAIRE, DEFAULT_RELAY_URL};
use crate::schema::Questionnaire;
use crate::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};

/// Client configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    relay_url: String,
    questionnaire: String,
    logo_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// `questionnaire` is either the name of a bundled schema or a path to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidInput` if the relay URL is not an http(s) URL or the
    /// questionnaire reference is empty.
    pub fn new(
        relay_url: impl Into<String>,
        questionnaire: impl Into<String>,
        logo_path: Option<PathBuf>,
    ) -> IntakeResult<Self> {
        let relay_url = relay_url.into().trim().to_string();
        if !(relay_url.starts_with("http://") || relay_url.starts_with("https://")) {
            return Err(IntakeError::InvalidInput(format!(
                "relay URL must start with http:// or https://, got '{relay_url}'"
            )));
        }

        let questionnaire = questionnaire.into().trim().to_string();
        if questionnaire.is_empty() {
            return Err(IntakeError::InvalidInput(
                "questionnaire cannot be empty".into(),
            ));
        }

        Ok(Self {
            relay_url,
            questionnaire,
            logo_path,
        })
    }

    /// Builds the configuration from optional overrides, falling back to the defaults.
    pub fn from_overrides(
        relay_url: Option<String>,
        questionnaire: Option<String>,
        logo_path: Option<PathBuf>,
    ) -> IntakeResult<Self> {
        Self::new(
            relay_url.unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            questionnaire.unwrap_or_else(|| DEFAULT_QUESTIONNAIRE.to_string()),
            logo_path,
        )
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    pub fn questionnaire(&self) -> &str {
        &self.questionnaire
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref()
    }

    /// Loads the configured questionnaire.
    pub fn load_questionnaire(&self) -> IntakeResult<Questionnaire> {
        resolve_questionnaire(&self.questionnaire)
    }
}

/// Resolve a questionnaire reference.
///
/// Bundled schema names win; anything else is read as a YAML file path.
///
/// # Errors
///
/// Returns `IntakeError::UnknownQuestionnaire` when the reference is neither a bundled
/// name nor an existing file, or any error raised while parsing the file.
pub fn resolve_questionnaire(reference: &str) -> IntakeResult<Questionnaire> {
    match Questionnaire::builtin(reference) {
        Ok(questionnaire) => Ok(questionnaire),
        Err(IntakeError::UnknownQuestionnaire(_)) => {
            let path = Path::new(reference);
            if path.is_file() {
                Questionnaire::from_path(path)
            } else {
                Err(IntakeError::UnknownQuestionnaire(reference.to_string()))
            }
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_applied() {
        let config = ClientConfig::from_overrides(None, None, None).unwrap();
        assert_eq!(config.relay_url(), DEFAULT_RELAY_URL);
        assert_eq!(config.questionnaire(), DEFAULT_QUESTIONNAIRE);
        assert!(config.logo_path().is_none());
        let q = config.load_questionnaire().unwrap();
        assert_eq!(q.id.as_str(), DEFAULT_QUESTIONNAIRE);
    }

    #[test]
    fn relay_url_must_be_http() {
        let err = ClientConfig::new("ftp://relay", "fluido", None).expect_err("ftp");
        assert!(matches!(err, IntakeError::InvalidInput(ref msg) if msg.contains("http")));
    }

    #[test]
    fn empty_questionnaire_is_rejected() {
        let err = ClientConfig::new("http://localhost", "  ", None).expect_err("empty");
        assert!(matches!(err, IntakeError::InvalidInput(_)));
    }

    #[test]
    fn unknown_reference_is_reported() {
        let err = resolve_questionnaire("does-not-exist").expect_err("unknown");
        assert!(matches!(err, IntakeError::UnknownQuestionnaire(ref n) if n == "does-not-exist"));
    }

    #[test]
    fn file_reference_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = include_str!("../schemas/fluido.yaml");
        file.write_all(yaml.as_bytes()).unwrap();

        let path = file.path().to_string_lossy().to_string();
        let q = resolve_questionnaire(&path).unwrap();
        assert_eq!(q.id.as_str(), "fluido");
    }
}
