//! Email assembled from a submission.

use crate::{MailError, MailResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;

pub const BODY_TEXT: &str = "Segue em anexo o documento assinado.";
pub const ATTACHMENT_NAME: &str = "questionario.pdf";
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/pdf";

/// A transcript ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

impl OutgoingMail {
    /// Wraps a PDF with the standard body text and attachment name.
    pub fn transcript(subject: impl Into<String>, pdf: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            body: BODY_TEXT.to_string(),
            attachment_name: ATTACHMENT_NAME.to_string(),
            attachment: pdf,
        }
    }
}

/// `"{prefix} - {plate} - dd/mm/yyyy"`. The plate segment is left out when unknown.
pub fn subject_line(prefix: &str, plate: Option<&str>, date: NaiveDate) -> String {
    let date = date.format("%d/%m/%Y");
    match plate.map(str::trim).filter(|p| !p.is_empty()) {
        Some(plate) => format!("{prefix} - {plate} - {date}"),
        None => format!("{prefix} - {date}"),
    }
}

/// Decodes the submitted document.
///
/// Accepts bare base64 or a data URL; everything up to the first comma is dropped.
///
/// # Errors
///
/// Returns `MailError::MissingDocument` for an absent or empty payload, and
/// `MailError::InvalidDocument` when the remainder is not base64.
pub fn decode_document(payload: Option<&str>) -> MailResult<Vec<u8>> {
    let payload = payload.map(str::trim).unwrap_or_default();
    let encoded = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => payload,
    };
    if encoded.is_empty() {
        return Err(MailError::MissingDocument);
    }
    STANDARD.decode(encoded).map_err(MailError::InvalidDocument)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn subject_uses_brazilian_date_format() {
        assert_eq!(
            subject_line("Questionário - Fluido Automático", Some("ABC1D23"), date()),
            "Questionário - Fluido Automático - ABC1D23 - 07/03/2024"
        );
    }

    #[test]
    fn subject_without_plate() {
        assert_eq!(subject_line("Intake", None, date()), "Intake - 07/03/2024");
        assert_eq!(subject_line("Intake", Some(" "), date()), "Intake - 07/03/2024");
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let pdf = decode_document(Some("data:application/pdf;base64,JVBERi0=")).unwrap();
        assert_eq!(pdf, b"%PDF-");
        let bare = decode_document(Some("JVBERi0=")).unwrap();
        assert_eq!(bare, b"%PDF-");
    }

    #[test]
    fn missing_document_is_reported() {
        assert!(matches!(decode_document(None), Err(MailError::MissingDocument)));
        assert!(matches!(decode_document(Some("")), Err(MailError::MissingDocument)));
        assert!(matches!(
            decode_document(Some("data:application/pdf;base64,")),
            Err(MailError::MissingDocument)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let err = decode_document(Some("not base64!")).expect_err("garbage");
        assert!(matches!(err, MailError::InvalidDocument(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn transcript_mail_defaults() {
        let mail = OutgoingMail::transcript("s", b"%PDF-".to_vec());
        assert_eq!(mail.body, BODY_TEXT);
        assert_eq!(mail.attachment_name, "questionario.pdf");
    }
}
