//! Form controller.
//!
//! Headless state of one intake form: the answer map, the visibility of conditional
//! sub-questions, the signature surface and the submission status. A front end feeds it
//! input events and renders from its getters.
//!
//! Submission runs `Idle → Submitting → {Success, Failed}`; `acknowledge` closes the
//! confirmation and returns to `Idle`. Validation and blank-signature failures are
//! reported before the state leaves `Idle`, so they never reach the network.

use crate::answers::AnswerMap;
use crate::constants::PDF_DATA_URL_PREFIX;
use crate::relay::MailRelayClient;
use crate::schema::{FieldRef, Questionnaire};
use crate::signature::{Signature, SignatureCanvas};
use crate::transcript::TranscriptRenderer;
use crate::validation::validate_submission;
use crate::visibility::{VisibilityState, VisibilityTable};
use crate::{IntakeError, IntakeResult};
use api_shared::{MessageRes, SendPdfReq};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    /// Confirmation message returned by the relay.
    Success(String),
    /// Error text to show the user, verbatim from the relay when it answered.
    Failed(String),
}

/// Drives one questionnaire from first answer to relay confirmation.
pub struct FormController<R: MailRelayClient> {
    questionnaire: Arc<Questionnaire>,
    table: VisibilityTable,
    renderer: TranscriptRenderer,
    relay: R,
    answers: AnswerMap,
    visibility: VisibilityState,
    canvas: SignatureCanvas,
    status: SubmissionStatus,
}

impl<R: MailRelayClient> FormController<R> {
    pub fn new(questionnaire: Arc<Questionnaire>, renderer: TranscriptRenderer, relay: R) -> Self {
        let table = VisibilityTable::from_questionnaire(&questionnaire);
        Self {
            questionnaire,
            table,
            renderer,
            relay,
            answers: AnswerMap::new(),
            visibility: VisibilityState::new(),
            canvas: SignatureCanvas::default(),
            status: SubmissionStatus::Idle,
        }
    }

    /// Replaces the default signature surface, e.g. to match the front end's size.
    pub fn with_canvas(mut self, canvas: SignatureCanvas) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn visibility(&self) -> &VisibilityState {
        &self.visibility
    }

    pub fn canvas(&self) -> &SignatureCanvas {
        &self.canvas
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    /// Loading flag for the submit button.
    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    /// Records one field.
    ///
    /// Upper-casing fields are normalised on entry, and answering a question
    /// re-evaluates the visibility of its sub-questions.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::UnknownField` if `key` is not part of the questionnaire.
    pub fn answer(&mut self, key: &str, value: impl Into<String>) -> IntakeResult<()> {
        let value = value.into();
        let (value, is_question) = match self.questionnaire.field(key) {
            None => return Err(IntakeError::UnknownField(key.to_string())),
            Some(FieldRef::Client(field)) if field.uppercase => (value.to_uppercase(), false),
            Some(FieldRef::Question(_)) => (value, true),
            Some(_) => (value, false),
        };

        if is_question {
            self.update_visibility(key, &value)?;
        }
        self.answers.record(key, value);
        Ok(())
    }

    /// Sets the visibility of `question_key`'s sub-questions from its rule.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::UnknownField` if `question_key` is not a question.
    pub fn update_visibility(&mut self, question_key: &str, answer: &str) -> IntakeResult<bool> {
        let visible = self.visibility.update(&self.table, question_key, answer)?;
        tracing::debug!(question = question_key, visible, "visibility updated");
        Ok(visible)
    }

    /// Replaces the signature surface with a drawn bitmap.
    pub fn set_signature_bitmap(&mut self, bitmap: RgbaImage) {
        self.canvas.load(bitmap);
    }

    /// Replaces the signature surface with a PNG export.
    pub fn load_signature_png(&mut self, png: &[u8]) -> IntakeResult<()> {
        self.canvas.load_png(png)
    }

    pub fn clear_signature(&mut self) {
        self.canvas.clear();
    }

    /// Reads the signature surface.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::BlankSignature` when nothing was drawn.
    pub fn capture_signature(&self) -> IntakeResult<Signature> {
        self.canvas.capture()
    }

    /// Runs the required-field and pattern checks on the current answers.
    pub fn validate(&self) -> IntakeResult<()> {
        validate_submission(&self.questionnaire, &self.answers, &self.visibility)
    }

    /// Renders the transcript of the current answers.
    ///
    /// The signature block is included only when something was drawn.
    pub fn render_transcript(&self) -> IntakeResult<Vec<u8>> {
        let signature = match self.canvas.capture() {
            Ok(signature) => Some(signature),
            Err(IntakeError::BlankSignature) => None,
            Err(e) => return Err(e),
        };
        self.renderer.render_answers(
            &self.questionnaire,
            &self.answers,
            &self.visibility,
            signature.as_ref(),
        )
    }

    /// Validates, renders and sends the form in a single relay call.
    ///
    /// On success answers, visibility and signature are reset. On failure everything is
    /// kept so the user can resubmit, and the status carries the relay's error text.
    ///
    /// # Errors
    ///
    /// - `IntakeError::Validation` / `IntakeError::BlankSignature` before any network call
    /// - `IntakeError::Relay` when the relay rejects the submission or cannot be reached
    pub async fn submit(&mut self) -> IntakeResult<MessageRes> {
        self.validate()?;
        let signature = self.capture_signature()?;

        self.status = SubmissionStatus::Submitting;

        let pdf = match self.renderer.render_answers(
            &self.questionnaire,
            &self.answers,
            &self.visibility,
            Some(&signature),
        ) {
            Ok(pdf) => pdf,
            Err(e) => {
                self.status = SubmissionStatus::Failed(e.to_string());
                return Err(e);
            }
        };

        let req = SendPdfReq {
            document_base64: Some(encode_document(&pdf)),
            metadata: Some(
                self.answers
                    .to_visible_metadata(&self.questionnaire, &self.visibility),
            ),
        };

        match self.relay.send(&req).await {
            Ok(res) => {
                tracing::info!(
                    questionnaire = %self.questionnaire.id,
                    bytes = pdf.len(),
                    "submission delivered"
                );
                self.reset();
                self.status = SubmissionStatus::Success(res.message.clone());
                Ok(res)
            }
            Err(err) => {
                tracing::warn!(error = %err, "submission failed");
                self.status = SubmissionStatus::Failed(err.user_message());
                Err(err.into())
            }
        }
    }

    /// Closes the confirmation or error message.
    pub fn acknowledge(&mut self) {
        if matches!(
            self.status,
            SubmissionStatus::Success(_) | SubmissionStatus::Failed(_)
        ) {
            self.status = SubmissionStatus::Idle;
        }
    }

    fn reset(&mut self) {
        self.answers.clear();
        self.visibility.clear();
        self.canvas.clear();
    }
}

/// Wraps PDF bytes as a `data:application/pdf;base64,` URL.
pub fn encode_document(pdf: &[u8]) -> String {
    format!("{PDF_DATA_URL_PREFIX}{}", STANDARD.encode(pdf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::tests::signed_canvas;
    use crate::RelayError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and answers with a canned result.
    #[derive(Clone)]
    struct FakeRelay {
        requests: Arc<Mutex<Vec<SendPdfReq>>>,
        reject: Option<(u16, String)>,
    }

    impl FakeRelay {
        fn accepting() -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                reject: None,
            }
        }

        fn rejecting(status: u16, body: &str) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                reject: Some((status, body.to_string())),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailRelayClient for FakeRelay {
        async fn send(&self, req: &SendPdfReq) -> Result<MessageRes, RelayError> {
            self.requests.lock().unwrap().push(req.clone());
            match &self.reject {
                Some((status, body)) => Err(RelayError::Rejected {
                    status: *status,
                    body: body.clone(),
                }),
                None => Ok(MessageRes::new("E-mail enviado")),
            }
        }
    }

    fn controller(relay: FakeRelay) -> FormController<FakeRelay> {
        let questionnaire = Arc::new(Questionnaire::builtin("fluido").unwrap());
        FormController::new(questionnaire, TranscriptRenderer::new(), relay)
    }

    fn fill(controller: &mut FormController<FakeRelay>) {
        controller.answer("cliente", "Maria Souza").unwrap();
        controller.answer("placa", "abc1d23").unwrap();
        let keys: Vec<String> = controller
            .questionnaire()
            .questions
            .iter()
            .map(|q| q.key.to_string())
            .collect();
        for key in keys {
            controller.answer(&key, "Não").unwrap();
        }
        controller.answer("fluido", "Sim").unwrap();
        controller.answer("kmUltimaTroca", "80000").unwrap();
        controller.answer("dataUltimaTroca", "2023-05").unwrap();
        controller.answer("observacao", "Nenhuma").unwrap();
    }

    #[test]
    fn answering_a_question_updates_visibility() {
        let mut c = controller(FakeRelay::accepting());
        c.answer("fluido", "Sim").unwrap();
        assert!(c.visibility().is_visible("fluido"));
        c.answer("fluido", "Não").unwrap();
        assert!(!c.visibility().is_visible("fluido"));
        assert_eq!(c.answers().get("fluido"), Some("Não"));
    }

    #[test]
    fn plate_is_upper_cased() {
        let mut c = controller(FakeRelay::accepting());
        c.answer("placa", "abc1d23").unwrap();
        assert_eq!(c.answers().get("placa"), Some("ABC1D23"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut c = controller(FakeRelay::accepting());
        let err = c.answer("nope", "x").expect_err("unknown key");
        assert!(matches!(err, IntakeError::UnknownField(ref k) if k == "nope"));
        assert!(c.answers().is_empty());
    }

    #[tokio::test]
    async fn blank_signature_blocks_before_network() {
        let relay = FakeRelay::accepting();
        let mut c = controller(relay.clone());
        fill(&mut c);

        let err = c.submit().await.expect_err("blank signature");
        assert!(matches!(err, IntakeError::BlankSignature));
        assert_eq!(relay.calls(), 0);
        assert_eq!(c.status(), &SubmissionStatus::Idle);
    }

    #[tokio::test]
    async fn validation_failure_blocks_before_network() {
        let relay = FakeRelay::accepting();
        let mut c = controller(relay.clone()).with_canvas(signed_canvas());
        fill(&mut c);
        c.answer("dataUltimaTroca", "").unwrap();

        let err = c.submit().await.expect_err("missing follow-up");
        assert!(matches!(err, IntakeError::Validation(ref e) if e.contains("dataUltimaTroca")));
        assert_eq!(relay.calls(), 0);
    }

    #[tokio::test]
    async fn rejected_submission_keeps_state_and_surfaces_body() {
        let relay = FakeRelay::rejecting(500, r#"{"message":"SMTP indisponível"}"#);
        let mut c = controller(relay.clone()).with_canvas(signed_canvas());
        fill(&mut c);
        let answers_before = c.answers().clone();
        let visibility_before = c.visibility().clone();

        let err = c.submit().await.expect_err("relay rejects");
        assert!(matches!(err, IntakeError::Relay(RelayError::Rejected { status: 500, .. })));
        assert_eq!(relay.calls(), 1);
        assert_eq!(c.answers(), &answers_before);
        assert_eq!(c.visibility(), &visibility_before);
        assert!(!c.canvas().is_blank());
        assert_eq!(
            c.status(),
            &SubmissionStatus::Failed(r#"{"message":"SMTP indisponível"}"#.to_string())
        );

        c.acknowledge();
        assert_eq!(c.status(), &SubmissionStatus::Idle);
    }

    #[tokio::test]
    async fn accepted_submission_resets_everything() {
        let relay = FakeRelay::accepting();
        let mut c = controller(relay.clone()).with_canvas(signed_canvas());
        fill(&mut c);

        let res = c.submit().await.expect("delivered");
        assert_eq!(res.message, "E-mail enviado");
        assert_eq!(relay.calls(), 1);
        assert!(c.answers().is_empty());
        assert!(c.visibility().is_empty());
        assert!(c.canvas().is_blank());
        assert_eq!(c.status(), &SubmissionStatus::Success("E-mail enviado".into()));

        c.acknowledge();
        assert_eq!(c.status(), &SubmissionStatus::Idle);
    }

    #[tokio::test]
    async fn request_carries_pdf_and_answers() {
        let relay = FakeRelay::accepting();
        let mut c = controller(relay.clone()).with_canvas(signed_canvas());
        fill(&mut c);
        c.submit().await.unwrap();

        let requests = relay.requests.lock().unwrap();
        let req = &requests[0];
        let document = req.document_base64.as_deref().unwrap();
        let pdf = STANDARD
            .decode(document.strip_prefix(PDF_DATA_URL_PREFIX).unwrap())
            .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(req.metadata_str("placa"), Some("ABC1D23"));
        assert_eq!(req.metadata_str("kmUltimaTroca"), Some("80000"));
    }

    #[tokio::test]
    async fn hidden_follow_up_answers_are_not_sent() {
        let relay = FakeRelay::accepting();
        let mut c = controller(relay.clone()).with_canvas(signed_canvas());
        fill(&mut c);
        c.answer("fluido", "Não").unwrap();
        assert_eq!(c.answers().get("kmUltimaTroca"), Some("80000"));

        c.submit().await.unwrap();

        let requests = relay.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.metadata_str("fluido"), Some("Não"));
        assert!(req.metadata_str("kmUltimaTroca").is_none());
        assert!(req.metadata_str("dataUltimaTroca").is_none());
    }
}
