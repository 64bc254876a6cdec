#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("document payload is missing")]
    MissingDocument,
    #[error("document payload is not valid base64: {0}")]
    InvalidDocument(base64::DecodeError),
    #[error("invalid mail configuration: {0}")]
    Config(String),
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("failed to send email: {0}")]
    Transport(String),
}

impl MailError {
    /// True for failures caused by the request rather than by delivery.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MailError::MissingDocument | MailError::InvalidDocument(_))
    }
}

pub type MailResult<T> = std::result::Result<T, MailError>;
