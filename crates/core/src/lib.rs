//! # Intake Core
//!
//! Core logic of the transmission-fluid intake questionnaire.
//!
//! This crate contains everything the form needs apart from the screen:
//! - Questionnaire schemas and the answer map
//! - Declarative visibility of conditional sub-questions
//! - Signature capture, validation and the submission state machine
//! - Deterministic PDF transcripts
//! - The client side of the Mail Relay
//!
//! **No server concerns**: SMTP delivery and the HTTP endpoint belong in `intake-mail`
//! and `api-rest`.

pub mod answers;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
mod pdf;
pub mod relay;
pub mod schema;
pub mod signature;
pub mod transcript;
pub mod validation;
pub mod visibility;

pub use answers::AnswerMap;
pub use config::ClientConfig;
pub use controller::{FormController, SubmissionStatus};
pub use error::{IntakeError, IntakeResult, RelayError};
pub use relay::{HttpRelayClient, MailRelayClient};
pub use schema::Questionnaire;
pub use signature::{Signature, SignatureCanvas};
pub use transcript::{Transcript, TranscriptRenderer};
pub use visibility::{VisibilityState, VisibilityTable};

// Wire types shared with the relay endpoint.
pub use api_shared::{MessageRes, SendPdfReq};
