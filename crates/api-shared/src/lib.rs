//! # API Shared
//!
//! Shared definitions for the intake APIs.
//!
//! Contains:
//! - Wire types of the Mail Relay endpoint (`SendPdfReq`, `MessageRes`)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` on the server side and by `intake-core`'s relay client.

pub mod health;
pub mod relay;

pub use health::{HealthRes, HealthService};
pub use relay::{MessageRes, SendPdfReq, SEND_PDF_PATH};
