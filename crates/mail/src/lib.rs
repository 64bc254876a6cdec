//! # Intake Mail
//!
//! Server side of the Mail Relay.
//!
//! Turns a submitted transcript into an email with the PDF attached and hands it to an
//! SMTP server. Delivery sits behind [`MailSender`] so the HTTP layer can be tested
//! without a mail server.

pub mod config;
pub mod error;
pub mod message;
pub mod relay;
pub mod sender;

pub use config::SmtpConfig;
pub use error::{MailError, MailResult};
pub use message::OutgoingMail;
pub use relay::MailRelay;
pub use sender::{MailSender, SmtpMailer};
