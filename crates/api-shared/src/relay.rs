//! Wire types of the Mail Relay endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Path the Mail Relay is mounted on.
pub const SEND_PDF_PATH: &str = "/api/send-pdf";

/// Submission sent to the Mail Relay.
///
/// Both fields are optional on the wire so that a missing document is reported as a
/// `400` by the relay rather than as a JSON rejection. The older `pdfBase64`/`form`
/// field names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendPdfReq {
    /// Base64 PDF, optionally as a `data:application/pdf;base64,` URL.
    #[serde(default, alias = "pdfBase64", skip_serializing_if = "Option::is_none")]
    pub document_base64: Option<String>,
    /// Flat answer map of the submission; `placa` is used in the mail subject.
    #[serde(default, alias = "form", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

impl SendPdfReq {
    /// String value of a metadata field, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

/// Status message returned by the Mail Relay, for success and failure alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
