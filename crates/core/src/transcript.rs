//! Transcript layout.
//!
//! Builds the ordered content of the signed document from the questionnaire, the answer
//! map and the visibility state, then hands it to the PDF writer. Building is pure: the
//! same inputs always give the same [`Transcript`], and the writer never adds timestamps
//! or random identifiers, so rendering is byte-for-byte repeatable.

use crate::answers::AnswerMap;
use crate::pdf::{self, Logo};
use crate::schema::Questionnaire;
use crate::signature::Signature;
use crate::visibility::VisibilityState;
use crate::{IntakeError, IntakeResult};
use image::RgbImage;
use std::path::Path;

/// One boxed block of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    /// Client information uses a section header; questions use the question style.
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    ClientInfo,
    Question,
    Remarks,
}

/// Ordered content of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub title: String,
    pub sections: Vec<Section>,
    pub signature: Option<Signature>,
}

impl Transcript {
    /// Lays out the transcript.
    ///
    /// Order: client information, one section per question (answer first, then every
    /// sub-answer when the question is visible), remarks. The signature is attached only
    /// when one was captured.
    pub fn build(
        questionnaire: &Questionnaire,
        answers: &AnswerMap,
        visibility: &VisibilityState,
        signature: Option<&Signature>,
    ) -> Self {
        let mut sections = Vec::with_capacity(questionnaire.questions.len() + 2);

        sections.push(Section {
            heading: questionnaire.client_section.clone(),
            kind: SectionKind::ClientInfo,
            lines: questionnaire
                .client_fields
                .iter()
                .map(|f| {
                    labelled(f.transcript_label(), answers.value_or_empty(f.key.as_str()))
                })
                .collect(),
        });

        for question in &questionnaire.questions {
            let key = question.key.as_str();
            let mut lines = vec![answers.value_or_empty(key).to_string()];
            if visibility.is_visible(key) {
                lines.extend(question.sub_questions.iter().map(|sub| {
                    labelled(
                        sub.transcript_label(),
                        answers.value_or_empty(sub.key.as_str()),
                    )
                }));
            }
            sections.push(Section {
                heading: question.prompt.to_string(),
                kind: SectionKind::Question,
                lines,
            });
        }

        let remarks = &questionnaire.remarks;
        sections.push(Section {
            heading: remarks.transcript_label().to_string(),
            kind: SectionKind::Remarks,
            lines: vec![answers.value_or_empty(remarks.key.as_str()).to_string()],
        });

        Self {
            title: questionnaire.transcript_title.to_string(),
            sections,
            signature: signature.cloned(),
        }
    }

    /// Every line of text in document order, headings included.
    pub fn text_lines(&self) -> Vec<&str> {
        let mut out = vec![self.title.as_str()];
        for section in &self.sections {
            out.push(section.heading.as_str());
            out.extend(section.lines.iter().map(String::as_str));
        }
        out
    }
}

/// `"Label: value"`, without a doubled separator when the label already ends in one.
fn labelled(label: &str, value: &str) -> String {
    let label = label.trim_end();
    if label.ends_with(':') || label.ends_with('?') || label.ends_with('.') {
        format!("{label} {value}")
    } else {
        format!("{label}: {value}")
    }
}

/// Renders transcripts to PDF.
#[derive(Debug, Clone, Default)]
pub struct TranscriptRenderer {
    logo: Option<Logo>,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints `logo` centred above the title.
    pub fn with_logo(mut self, logo: RgbImage) -> Self {
        self.logo = Some(Logo::new(logo));
        self
    }

    /// Loads the logo from an image file (PNG or JPEG).
    pub fn with_logo_path(self, path: &Path) -> IntakeResult<Self> {
        let bytes = std::fs::read(path).map_err(IntakeError::FileRead)?;
        let logo = image::load_from_memory(&bytes)
            .map_err(IntakeError::Image)?
            .to_rgb8();
        Ok(self.with_logo(logo))
    }

    pub fn has_logo(&self) -> bool {
        self.logo.is_some()
    }

    pub fn render(&self, transcript: &Transcript) -> IntakeResult<Vec<u8>> {
        pdf::write_transcript(transcript, self.logo.as_ref())
    }

    /// Builds and renders in one step.
    pub fn render_answers(
        &self,
        questionnaire: &Questionnaire,
        answers: &AnswerMap,
        visibility: &VisibilityState,
        signature: Option<&Signature>,
    ) -> IntakeResult<Vec<u8>> {
        let transcript = Transcript::build(questionnaire, answers, visibility, signature);
        self.render(&transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::tests::signed_canvas;

    fn fluido() -> Questionnaire {
        Questionnaire::builtin("fluido").unwrap()
    }

    fn answers(fluido_answer: &str) -> AnswerMap {
        [
            ("cliente", "Maria Souza"),
            ("placa", "ABC1D23"),
            ("fluido", fluido_answer),
            ("kmUltimaTroca", "80000"),
            ("dataUltimaTroca", "2023-05"),
            ("observacao", "Barulho ao engatar a ré"),
        ]
        .into_iter()
        .collect()
    }

    fn section<'a>(t: &'a Transcript, heading: &str) -> &'a Section {
        t.sections
            .iter()
            .find(|s| s.heading == heading)
            .expect("section present")
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn visible_question_lists_every_sub_answer() {
        let q = fluido();
        let visibility: VisibilityState = [("fluido", true)].into_iter().collect();
        let t = Transcript::build(&q, &answers("Sim"), &visibility, None);

        let block = section(&t, "O fluido já foi trocado anteriormente?");
        assert_eq!(
            block.lines,
            vec![
                "Sim".to_string(),
                "KM na última troca: 80000".to_string(),
                "Data da última troca: 2023-05".to_string(),
            ]
        );
    }

    #[test]
    fn hidden_question_omits_sub_answers() {
        let q = fluido();
        let visibility: VisibilityState = [("fluido", false)].into_iter().collect();
        let t = Transcript::build(&q, &answers("Não"), &visibility, None);

        let block = section(&t, "O fluido já foi trocado anteriormente?");
        assert_eq!(block.lines, vec!["Não".to_string()]);
        assert!(!t.text_lines().iter().any(|l| l.contains("80000")));
        assert!(!t.text_lines().iter().any(|l| l.contains("2023-05")));
    }

    #[test]
    fn sections_follow_form_order() {
        let q = fluido();
        let t = Transcript::build(&q, &answers("Não"), &VisibilityState::new(), None);

        assert_eq!(t.sections.len(), q.questions.len() + 2);
        assert_eq!(t.sections[0].kind, SectionKind::ClientInfo);
        assert_eq!(
            t.sections[0].lines,
            vec!["Nome: Maria Souza".to_string(), "Placa: ABC1D23".to_string()]
        );
        assert_eq!(t.sections[1].heading, q.questions[0].prompt.as_str());
        let last = t.sections.last().unwrap();
        assert_eq!(last.kind, SectionKind::Remarks);
        assert_eq!(last.heading, "Observações adicionais");
    }

    #[test]
    fn question_labels_are_not_doubled() {
        assert_eq!(labelled("Quais?", "Falha"), "Quais? Falha");
        assert_eq!(labelled("Nome", "Ana"), "Nome: Ana");
    }

    #[test]
    fn pdf_contains_visible_sub_answers_only() {
        let q = fluido();
        let renderer = TranscriptRenderer::new();

        let shown: VisibilityState = [("fluido", true)].into_iter().collect();
        let pdf = renderer
            .render_answers(&q, &answers("Sim"), &shown, None)
            .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(contains(&pdf, b"80000"));
        assert!(contains(&pdf, b"2023-05"));

        let hidden: VisibilityState = [("fluido", false)].into_iter().collect();
        let pdf = renderer
            .render_answers(&q, &answers("Não"), &hidden, None)
            .unwrap();
        assert!(!contains(&pdf, b"80000"));
        assert!(!contains(&pdf, b"2023-05"));
    }

    #[test]
    fn rendering_is_repeatable() {
        let q = Questionnaire::builtin("transmissao").unwrap();
        let mut answers = AnswerMap::new();
        answers.record("cliente", "João");
        answers.record("placa", "XYZ9A87");
        for question in &q.questions {
            answers.record(question.key.as_str(), "Sim");
            for sub in &question.sub_questions {
                answers.record(sub.key.as_str(), format!("resposta {}", sub.key));
            }
        }
        answers.record("observacao", "Sem observações");
        let visibility = crate::visibility::VisibilityTable::from_questionnaire(&q)
            .state_for(&answers);
        let signature = signed_canvas().capture().unwrap();

        let renderer = TranscriptRenderer::new().with_logo(RgbImage::from_pixel(
            40,
            20,
            image::Rgb([30, 64, 175]),
        ));
        let first = renderer
            .render_answers(&q, &answers, &visibility, Some(&signature))
            .unwrap();
        let second = renderer
            .render_answers(&q, &answers, &visibility, Some(&signature))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn signature_block_only_when_signed() {
        let q = fluido();
        let renderer = TranscriptRenderer::new();
        let visibility = VisibilityState::new();

        let unsigned = renderer
            .render_answers(&q, &answers("Não"), &visibility, None)
            .unwrap();
        assert!(!contains(&unsigned, b"/Image"));
        assert!(!contains(&unsigned, b"Assinatura do cliente"));

        let signature = signed_canvas().capture().unwrap();
        let signed = renderer
            .render_answers(&q, &answers("Não"), &visibility, Some(&signature))
            .unwrap();
        assert!(contains(&signed, b"/Image"));
        assert!(contains(&signed, b"Assinatura do cliente"));
    }
}
