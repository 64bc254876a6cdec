//! Constants used throughout the intake core crate.
//!
//! Answer literals, defaults and payload prefixes live here so the controller, the
//! renderer and the relay client agree on them.

/// Affirmative answer of a yes/no question.
pub const YES: &str = "Sim";

/// Negative answer of a yes/no question.
pub const NO: &str = "Não";

/// Questionnaire used when no override is configured.
pub const DEFAULT_QUESTIONNAIRE: &str = "transmissao";

/// Default Mail Relay endpoint for the relay client.
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000/api/send-pdf";

/// Prefix of the data URL carrying the rendered transcript.
pub const PDF_DATA_URL_PREFIX: &str = "data:application/pdf;base64,";

/// Prefix of the data URL carrying a PNG signature.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Default signature surface size, in pixels.
pub const SIGNATURE_CANVAS_WIDTH: u32 = 600;
pub const SIGNATURE_CANVAS_HEIGHT: u32 = 192;
