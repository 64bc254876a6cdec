use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, DEFAULT_REST_ADDR};
use intake_mail::{MailRelay, SmtpConfig, SmtpMailer};

/// Main entry point for the intake Mail Relay
///
/// Serves the REST API (Mail Relay, health, Swagger UI) on `INTAKE_REST_ADDR`.
///
/// # Environment Variables
/// - `INTAKE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SMTP_HOST`, `SMTP_PORT` (default 465), `SMTP_USER`, `SMTP_PASS`: SMTP relay
/// - `FROM_EMAIL`, `TO_EMAIL`: sender and shop addresses
/// - `MAIL_SUBJECT_PREFIX`: subject prefix (default: "Questionário - Fluido Automático")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is incomplete or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_run=info".parse()?)
                .add_directive("intake_mail=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("INTAKE_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let smtp = SmtpConfig::from_env()?;
    tracing::info!("++ SMTP relay {}:{}", smtp.host, smtp.port);

    let mailer = SmtpMailer::new(&smtp)?;
    let relay = MailRelay::new(Arc::new(mailer), smtp.subject_prefix.clone());
    let app = api_rest::router(AppState::new(relay));

    tracing::info!("++ Starting intake REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
