//! SMTP delivery.

use crate::message::ATTACHMENT_CONTENT_TYPE;
use crate::{MailError, MailResult, OutgoingMail, SmtpConfig};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Mailboxes, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Delivers one email. Implementations do not retry.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> MailResult<()>;
}

/// Sends through an SMTP relay with TLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailboxes,
}

impl SmtpMailer {
    /// Builds the transport. No connection is made until the first send.
    ///
    /// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Address` for malformed sender or recipient addresses and
    /// `MailError::Config` if the recipient list is empty or the TLS parameters cannot
    /// be built for the host.
    pub fn new(config: &SmtpConfig) -> MailResult<Self> {
        let from: Mailbox = config.from.parse()?;
        // Comma-separated recipient list.
        let to: Mailboxes = config.to.parse()?;
        if to.iter().next().is_none() {
            return Err(MailError::Config("TO_EMAIL has no recipients".into()));
        }

        let builder = if config.port == crate::config::DEFAULT_SMTP_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Config(e.to_string()))?
        .port(config.port);

        let builder = match config.credentials() {
            Some((user, pass)) => {
                builder.credentials(Credentials::new(user.to_string(), pass.to_string()))
            }
            None => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> MailResult<()> {
        let message = build_message(&self.from, &self.to, mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Plain-text body plus the PDF attachment, addressed to every recipient.
pub fn build_message(from: &Mailbox, to: &Mailboxes, mail: OutgoingMail) -> MailResult<Message> {
    let content_type = ContentType::parse(ATTACHMENT_CONTENT_TYPE)
        .map_err(|e| MailError::Config(e.to_string()))?;

    let mut builder = Message::builder().from(from.clone());
    for mailbox in to.iter() {
        builder = builder.to(mailbox.clone());
    }
    let message = builder
        .subject(mail.subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(mail.body))
                .singlepart(Attachment::new(mail.attachment_name).body(mail.attachment, content_type)),
        )?;
    Ok(message)
}
