//! Mail Relay service.

use crate::message::{decode_document, subject_line};
use crate::{MailResult, MailSender, OutgoingMail};
use api_shared::SendPdfReq;
use chrono::{Local, NaiveDate};
use std::sync::Arc;

/// Metadata field shown in the subject line.
pub const PLATE_FIELD: &str = "placa";

/// Decodes a submission and sends it as one email.
#[derive(Clone)]
pub struct MailRelay {
    sender: Arc<dyn MailSender>,
    subject_prefix: String,
}

impl MailRelay {
    pub fn new(sender: Arc<dyn MailSender>, subject_prefix: impl Into<String>) -> Self {
        Self {
            sender,
            subject_prefix: subject_prefix.into(),
        }
    }

    /// Relays `req`, dating the subject with today's local date.
    pub async fn relay(&self, req: &SendPdfReq) -> MailResult<()> {
        self.relay_on(req, Local::now().date_naive()).await
    }

    /// Relays `req` with an explicit subject date.
    ///
    /// # Errors
    ///
    /// The payload is checked before anything is sent: `MailError::MissingDocument` and
    /// `MailError::InvalidDocument` mean no delivery was attempted. Delivery failures
    /// come back from the sender unchanged.
    pub async fn relay_on(&self, req: &SendPdfReq, date: NaiveDate) -> MailResult<()> {
        let pdf = decode_document(req.document_base64.as_deref())?;
        let subject = subject_line(&self.subject_prefix, req.metadata_str(PLATE_FIELD), date);

        tracing::info!(subject = %subject, bytes = pdf.len(), "relaying transcript");
        self.sender.send(OutgoingMail::transcript(subject, pdf)).await
    }
}
