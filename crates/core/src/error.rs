use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid questionnaire: {0}")]
    InvalidQuestionnaire(String),
    #[error("unknown questionnaire: {0}")]
    UnknownQuestionnaire(String),
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to serialize answers: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize answers: {0}")]
    Deserialization(serde_json::Error),

    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("signature is blank")]
    BlankSignature,
    #[error("invalid data URL")]
    InvalidDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(base64::DecodeError),
    #[error("image error: {0}")]
    Image(image::ImageError),
    #[error("failed to build PDF: {0}")]
    Pdf(lopdf::Error),
    #[error("failed to write PDF: {0}")]
    PdfWrite(String),

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
}

/// Failures reported by a Mail Relay call.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The relay answered with a non-2xx status.
    #[error("relay rejected the submission ({status}): {body}")]
    Rejected { status: u16, body: String },
    /// The request never produced a response.
    #[error("relay unreachable: {0}")]
    Transport(String),
}

impl RelayError {
    /// Text shown to the user. Rejections surface the response body verbatim.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Rejected { body, .. } => body.clone(),
            RelayError::Transport(reason) => reason.clone(),
        }
    }
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;
