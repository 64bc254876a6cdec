//! # API REST
//!
//! REST API implementation of the Mail Relay.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for the wire types and `intake-mail` for delivery.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{HealthRes, HealthService, MessageRes, SendPdfReq, SEND_PDF_PATH};
use intake_mail::{MailError, MailRelay};

/// Address the server binds to when `INTAKE_REST_ADDR` is unset.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

pub const MISSING_DOCUMENT_MESSAGE: &str = "PDF não enviado";
pub const SENT_MESSAGE: &str = "E-mail enviado";
pub const FALLBACK_ERROR_MESSAGE: &str = "Erro ao enviar";

/// Application state for the REST API server
///
/// Holds the Mail Relay shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    relay: MailRelay,
}

impl AppState {
    pub fn new(relay: MailRelay) -> Self {
        Self { relay }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, send_pdf),
    components(schemas(HealthRes, SendPdfReq, MessageRes))
)]
pub struct ApiDoc;

/// Builds the REST router: health, the Mail Relay endpoint and Swagger UI.
///
/// Methods other than `POST` on the relay path are answered with `405`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(SEND_PDF_PATH, post(send_pdf))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/send-pdf",
    request_body = SendPdfReq,
    responses(
        (status = 200, description = "Email sent", body = MessageRes),
        (status = 400, description = "Document missing or not base64", body = MessageRes),
        (status = 405, description = "Method not allowed"),
        (status = 500, description = "Delivery failed", body = MessageRes)
    )
)]
/// Emails a signed transcript to the shop
///
/// Accepts the document as base64 (optionally a data URL) plus the answer metadata, and
/// sends it as `questionario.pdf`.
///
/// # Returns
/// * `Ok(Json<MessageRes>)` - `"E-mail enviado"` once the SMTP server accepted the mail
/// * `Err((StatusCode, Json<MessageRes>))` - status and error text otherwise
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the body is not a JSON object,
/// - the document is missing or empty, or
/// - the document is not valid base64.
///
/// Returns `500 Internal Server Error` if delivery fails.
#[axum::debug_handler]
async fn send_pdf(
    State(state): State<AppState>,
    payload: Result<Json<SendPdfReq>, JsonRejection>,
) -> Result<Json<MessageRes>, (StatusCode, Json<MessageRes>)> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::warn!("Rejected relay body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(MessageRes::new(MISSING_DOCUMENT_MESSAGE)),
        )
    })?;

    match state.relay.relay(&req).await {
        Ok(()) => Ok(Json(MessageRes::new(SENT_MESSAGE))),
        Err(MailError::MissingDocument) => Err((
            StatusCode::BAD_REQUEST,
            Json(MessageRes::new(MISSING_DOCUMENT_MESSAGE)),
        )),
        Err(e) if e.is_client_error() => {
            tracing::warn!("Invalid relay payload: {}", e);
            Err((StatusCode::BAD_REQUEST, Json(MessageRes::new(e.to_string()))))
        }
        Err(e) => {
            tracing::error!("Mail relay error: {:?}", e);
            let message = e.to_string();
            let message = if message.is_empty() {
                FALLBACK_ERROR_MESSAGE.to_string()
            } else {
                message
            };
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(MessageRes::new(message))))
        }
    }
}
