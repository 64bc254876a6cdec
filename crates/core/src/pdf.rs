//! PDF writer for transcripts.
//!
//! Draws a [`Transcript`] onto A4 pages with the standard Helvetica fonts (WinAnsi
//! encoded), boxed sections and JPEG image XObjects for the logo and signature. Layout is
//! a single top-down cursor; a section that does not fit on the remaining page starts a
//! new one.

use crate::transcript::{SectionKind, Transcript};
use crate::{IntakeError, IntakeResult};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 36.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BOX_PADDING: f32 = 10.0;
const BOX_GAP: f32 = 10.0;
const ANSWER_INDENT: f32 = 8.0;
const ANSWER_GAP: f32 = 4.0;
const LINE_HEIGHT_FACTOR: f32 = 1.3;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f32 = 0.52;

const TITLE_SIZE: f32 = 14.0;
const SECTION_HEADER_SIZE: f32 = 12.0;
const TEXT_SIZE: f32 = 11.0;

const LOGO_BOX: (f32, f32) = (120.0, 50.0);
const SIGNATURE_BOX: (f32, f32) = (150.0, 50.0);
const SIGNATURE_LABEL: &str = "Assinatura do cliente";
const JPEG_QUALITY: u8 = 90;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const LOGO_NAME: &str = "Im1";
const SIGNATURE_NAME: &str = "Im2";

type Rgb = (f32, f32, f32);
const TITLE_COLOUR: Rgb = (0.118, 0.251, 0.686);
const HEADING_COLOUR: Rgb = (0.059, 0.090, 0.165);
const ANSWER_COLOUR: Rgb = (0.294, 0.333, 0.388);
const BOX_FILL: Rgb = (0.976, 0.980, 0.984);
const BOX_BORDER: Rgb = (0.898, 0.906, 0.922);

/// Logo printed above the title.
#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    image: RgbImage,
}

impl Logo {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }
}

#[derive(Clone, Copy)]
struct Style {
    font: &'static str,
    size: f32,
    colour: Rgb,
}

impl Style {
    fn line_height(&self) -> f32 {
        self.size * LINE_HEIGHT_FACTOR
    }
}

const TITLE: Style = Style {
    font: FONT_BOLD,
    size: TITLE_SIZE,
    colour: TITLE_COLOUR,
};
const SECTION_HEADER: Style = Style {
    font: FONT_BOLD,
    size: SECTION_HEADER_SIZE,
    colour: HEADING_COLOUR,
};
const QUESTION: Style = Style {
    font: FONT_BOLD,
    size: TEXT_SIZE,
    colour: HEADING_COLOUR,
};
const ANSWER: Style = Style {
    font: FONT_REGULAR,
    size: TEXT_SIZE,
    colour: ANSWER_COLOUR,
};

struct Image {
    name: &'static str,
    id: ObjectId,
    width: f32,
    height: f32,
}

impl Image {
    /// Size that fits inside `bounds` keeping the aspect ratio.
    fn contain(&self, bounds: (f32, f32)) -> (f32, f32) {
        let scale = (bounds.0 / self.width).min(bounds.1 / self.height);
        (self.width * scale, self.height * scale)
    }
}

struct PageWriter {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
    ops: Vec<Operation>,
    cursor: f32,
}

impl PageWriter {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular_id = doc.add_object(font_dictionary("Helvetica"));
        let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FONT_REGULAR => regular_id,
                FONT_BOLD => bold_id,
            },
        });

        Self {
            doc,
            pages_id,
            resources_id,
            page_ids: Vec::new(),
            ops: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn add_image(&mut self, name: &'static str, image: &RgbImage) -> IntakeResult<Image> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
            .map_err(IntakeError::Image)?;

        let id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));

        Ok(Image {
            name,
            id,
            width: image.width() as f32,
            height: image.height() as f32,
        })
    }

    fn at_page_top(&self) -> bool {
        self.ops.is_empty()
    }

    /// Starts a new page unless `height` still fits below the cursor.
    fn ensure_space(&mut self, height: f32) -> IntakeResult<()> {
        if self.cursor - height < MARGIN && !self.at_page_top() {
            self.finish_page()?;
        }
        Ok(())
    }

    fn finish_page(&mut self) -> IntakeResult<()> {
        let content = Content {
            operations: std::mem::take(&mut self.ops),
        };
        let encoded = content.encode().map_err(IntakeError::Pdf)?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));
        let media_box: Vec<Object> = vec![
            0_i64.into(),
            0_i64.into(),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Resources" => self.resources_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
        self.cursor = PAGE_HEIGHT - MARGIN;
        Ok(())
    }

    fn text(&mut self, style: Style, x: f32, baseline: f32, text: &str) {
        let (r, g, b) = style.colour;
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![style.font.into(), style.size.into()],
        ));
        self.ops
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        self.ops
            .push(Operation::new("Td", vec![x.into(), baseline.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Writes one line at the cursor and moves the cursor below it.
    fn line(&mut self, style: Style, x: f32, text: &str) {
        let baseline = self.cursor - style.size;
        self.text(style, x, baseline, text);
        self.cursor -= style.line_height();
    }

    fn centred_line(&mut self, style: Style, text: &str) {
        let width = estimate_width(text, style.size);
        let x = MARGIN + ((CONTENT_WIDTH - width) / 2.0).max(0.0);
        self.line(style, x, text);
    }

    fn boxed_background(&mut self, height: f32) {
        let (fr, fg, fb) = BOX_FILL;
        let (sr, sg, sb) = BOX_BORDER;
        self.ops.push(Operation::new("q", vec![]));
        self.ops
            .push(Operation::new("rg", vec![fr.into(), fg.into(), fb.into()]));
        self.ops
            .push(Operation::new("RG", vec![sr.into(), sg.into(), sb.into()]));
        self.ops.push(Operation::new("w", vec![1_i64.into()]));
        self.ops.push(Operation::new(
            "re",
            vec![
                MARGIN.into(),
                (self.cursor - height).into(),
                CONTENT_WIDTH.into(),
                height.into(),
            ],
        ));
        self.ops.push(Operation::new("B", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn image(&mut self, image: &Image, x: f32, size: (f32, f32)) {
        let (w, h) = size;
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                w.into(),
                0_i64.into(),
                0_i64.into(),
                h.into(),
                x.into(),
                (self.cursor - h).into(),
            ],
        ));
        self.ops
            .push(Operation::new("Do", vec![image.name.into()]));
        self.ops.push(Operation::new("Q", vec![]));
        self.cursor -= h;
    }

    /// A padded box holding a heading and indented answer lines.
    fn section(
        &mut self,
        heading: Style,
        heading_lines: &[String],
        lines: &[String],
    ) -> IntakeResult<()> {
        let body_height = heading_lines.len() as f32 * heading.line_height()
            + ANSWER_GAP
            + lines.len() as f32 * ANSWER.line_height();
        let height = body_height + 2.0 * BOX_PADDING;

        if height > PAGE_HEIGHT - 2.0 * MARGIN {
            // Taller than a page: flow line by line without the box.
            for text in heading_lines {
                self.ensure_space(heading.line_height())?;
                self.line(heading, MARGIN, text);
            }
            self.cursor -= ANSWER_GAP;
            for text in lines {
                self.ensure_space(ANSWER.line_height())?;
                self.line(ANSWER, MARGIN + ANSWER_INDENT, text);
            }
            self.cursor -= BOX_GAP;
            return Ok(());
        }

        self.ensure_space(height)?;
        self.boxed_background(height);
        self.cursor -= BOX_PADDING;
        for text in heading_lines {
            self.line(heading, MARGIN + BOX_PADDING, text);
        }
        self.cursor -= ANSWER_GAP;
        for text in lines {
            self.line(ANSWER, MARGIN + BOX_PADDING + ANSWER_INDENT, text);
        }
        self.cursor -= BOX_PADDING + BOX_GAP;
        Ok(())
    }

    fn finish(mut self) -> IntakeResult<Vec<u8>> {
        if !self.ops.is_empty() || self.page_ids.is_empty() {
            self.finish_page()?;
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| IntakeError::PdfWrite(e.to_string()))?;
        Ok(out)
    }
}

fn font_dictionary(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Writes the transcript as a PDF document.
pub(crate) fn write_transcript(
    transcript: &Transcript,
    logo: Option<&Logo>,
) -> IntakeResult<Vec<u8>> {
    let mut writer = PageWriter::new();

    let mut xobjects = Dictionary::new();
    let logo = match logo {
        Some(logo) => {
            let image = writer.add_image(LOGO_NAME, &logo.image)?;
            xobjects.set(LOGO_NAME, image.id);
            Some(image)
        }
        None => None,
    };
    let signature = match &transcript.signature {
        Some(signature) => {
            let rgb = signature.to_rgb_on_white()?;
            let image = writer.add_image(SIGNATURE_NAME, &rgb)?;
            xobjects.set(SIGNATURE_NAME, image.id);
            Some(image)
        }
        None => None,
    };
    if !xobjects.is_empty() {
        let resources = writer
            .doc
            .get_object_mut(writer.resources_id)
            .and_then(Object::as_dict_mut)
            .map_err(IntakeError::Pdf)?;
        resources.set("XObject", xobjects);
    }

    if let Some(logo) = &logo {
        let size = logo.contain(LOGO_BOX);
        let x = MARGIN + (CONTENT_WIDTH - size.0) / 2.0;
        writer.image(logo, x, size);
        writer.cursor -= 16.0;
    }

    for line in wrap(&transcript.title, TITLE.size, CONTENT_WIDTH) {
        writer.centred_line(TITLE, &line);
    }
    writer.cursor -= 16.0;

    let inner_width = CONTENT_WIDTH - 2.0 * BOX_PADDING;
    for section in &transcript.sections {
        let heading = match section.kind {
            SectionKind::ClientInfo => SECTION_HEADER,
            SectionKind::Question | SectionKind::Remarks => QUESTION,
        };
        let heading_lines = wrap(&section.heading, heading.size, inner_width);
        let lines: Vec<String> = section
            .lines
            .iter()
            .flat_map(|l| wrap(l, ANSWER.size, inner_width - ANSWER_INDENT))
            .collect();
        writer.section(heading, &heading_lines, &lines)?;
    }

    if let Some(image) = &signature {
        let size = image.contain(SIGNATURE_BOX);
        let height = QUESTION.line_height() + ANSWER_GAP + size.1 + 2.0 * BOX_PADDING;
        writer.cursor -= 6.0;
        writer.ensure_space(height)?;
        writer.boxed_background(height);
        writer.cursor -= BOX_PADDING;
        writer.line(QUESTION, MARGIN + BOX_PADDING, SIGNATURE_LABEL);
        writer.cursor -= ANSWER_GAP;
        writer.image(image, MARGIN + BOX_PADDING, size);
        writer.cursor -= BOX_PADDING;
    }

    writer.finish()
}

fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH_FACTOR
}

/// Greedy word wrap on estimated glyph widths. Explicit newlines are kept.
fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * GLYPH_WIDTH_FACTOR)).floor() as usize).max(1);
    let mut out = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                out.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }

            let needed =
                current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if needed > max_chars && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        out.push(current);
    }

    out
}

/// Maps text onto WinAnsiEncoding bytes; unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}
