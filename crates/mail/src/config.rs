//! SMTP configuration.
//!
//! Resolved once at startup from the environment and passed to [`crate::SmtpMailer`];
//! nothing here is read again while requests are served.

use crate::{MailError, MailResult};

/// Implicit-TLS submission port.
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Subject prefix used when none is configured.
pub const DEFAULT_SUBJECT_PREFIX: &str = "Questionário - Fluido Automático";

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Recipient list, comma-separated.
    pub to: String,
    pub subject_prefix: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

impl SmtpConfig {
    /// Builds the configuration from raw environment values.
    ///
    /// Empty strings count as unset. `SMTP_HOST`, `FROM_EMAIL` and `TO_EMAIL` are
    /// required.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Config` naming the first missing or malformed value.
    pub fn from_env_values(
        host: Option<String>,
        port: Option<String>,
        username: Option<String>,
        password: Option<String>,
        from: Option<String>,
        to: Option<String>,
        subject_prefix: Option<String>,
    ) -> MailResult<Self> {
        Ok(Self {
            host: required("SMTP_HOST", host)?,
            port: port_from_env_value(port)?,
            username: non_empty(username),
            password: non_empty(password),
            from: required("FROM_EMAIL", from)?,
            to: required("TO_EMAIL", to)?,
            subject_prefix: non_empty(subject_prefix)
                .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
        })
    }

    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `FROM_EMAIL`, `TO_EMAIL`
    /// and `MAIL_SUBJECT_PREFIX`.
    pub fn from_env() -> MailResult<Self> {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_env_values(
            var("SMTP_HOST"),
            var("SMTP_PORT"),
            var("SMTP_USER"),
            var("SMTP_PASS"),
            var("FROM_EMAIL"),
            var("TO_EMAIL"),
            var("MAIL_SUBJECT_PREFIX"),
        )
    }

    /// Credentials are only used when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Parse `SMTP_PORT`, defaulting to 465 when unset or empty.
pub fn port_from_env_value(value: Option<String>) -> MailResult<u16> {
    match non_empty(value) {
        None => Ok(DEFAULT_SMTP_PORT),
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| MailError::Config(format!("SMTP_PORT is not a valid port: {raw}"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str, value: Option<String>) -> MailResult<String> {
    non_empty(value).ok_or_else(|| MailError::Config(format!("{name} must be set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn port_defaults_to_implicit_tls() {
        assert_eq!(port_from_env_value(None).unwrap(), 465);
        assert_eq!(port_from_env_value(some("  ")).unwrap(), 465);
        assert_eq!(port_from_env_value(some("587")).unwrap(), 587);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = port_from_env_value(some("smtp")).expect_err("not a number");
        assert!(matches!(err, MailError::Config(ref msg) if msg.contains("SMTP_PORT")));
    }

    #[test]
    fn required_values_are_enforced() {
        let err = SmtpConfig::from_env_values(
            some("smtp.example.com"),
            None,
            None,
            None,
            None,
            some("oficina@example.com"),
            None,
        )
        .expect_err("missing FROM_EMAIL");
        assert!(matches!(err, MailError::Config(ref msg) if msg.contains("FROM_EMAIL")));
    }

    #[test]
    fn defaults_and_credentials() {
        let cfg = SmtpConfig::from_env_values(
            some("smtp.example.com"),
            None,
            some("user"),
            None,
            some("form@example.com"),
            some("oficina@example.com"),
            None,
        )
        .unwrap();
        assert_eq!(cfg.port, DEFAULT_SMTP_PORT);
        assert_eq!(cfg.subject_prefix, DEFAULT_SUBJECT_PREFIX);
        assert!(cfg.credentials().is_none());
    }

    #[test]
    fn debug_hides_password() {
        let cfg = SmtpConfig::from_env_values(
            some("smtp.example.com"),
            None,
            some("user"),
            some("hunter2"),
            some("form@example.com"),
            some("oficina@example.com"),
            None,
        )
        .unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
        assert_eq!(cfg.credentials(), Some(("user", "hunter2")));
    }
}
