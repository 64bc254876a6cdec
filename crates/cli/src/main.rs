use clap::{Parser, Subcommand};
use intake_core::{
    constants::DEFAULT_RELAY_URL, AnswerMap, ClientConfig, FormController,
    HttpRelayClient, IntakeError, Questionnaire, TranscriptRenderer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Transmission-fluid intake questionnaire CLI")]
struct Cli {
    /// Bundled questionnaire name or path to a YAML schema
    #[arg(long, global = true, env = "INTAKE_QUESTIONNAIRE")]
    questionnaire: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the questions and their follow-up rules
    Schema,
    /// Check an answers file against the questionnaire
    Validate {
        /// JSON object of field key to answer
        #[arg(long)]
        answers: PathBuf,
    },
    /// Render the transcript PDF without sending it
    Render {
        /// JSON object of field key to answer
        #[arg(long)]
        answers: PathBuf,
        /// PNG of the drawn signature
        #[arg(long)]
        signature: Option<PathBuf>,
        /// Logo printed above the title
        #[arg(long, env = "INTAKE_LOGO")]
        logo: Option<PathBuf>,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Render and post the transcript to the Mail Relay
    Submit {
        /// JSON object of field key to answer
        #[arg(long)]
        answers: PathBuf,
        /// PNG of the drawn signature
        #[arg(long)]
        signature: PathBuf,
        /// Logo printed above the title
        #[arg(long, env = "INTAKE_LOGO")]
        logo: Option<PathBuf>,
        /// Mail Relay endpoint
        #[arg(long, env = "INTAKE_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
        relay_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            let config = ClientConfig::from_overrides(None, cli.questionnaire, None)?;
            print!("{}", describe(&config.load_questionnaire()?));
        }
        Commands::Validate { answers } => {
            let config = ClientConfig::from_overrides(None, cli.questionnaire, None)?;
            let controller = load_controller(&config, &answers, None)?;
            match controller.validate() {
                Ok(()) => println!("Answers are complete."),
                Err(IntakeError::Validation(errors)) => {
                    for issue in errors.issues() {
                        eprintln!("{}: {}", issue.key, issue.message);
                    }
                    anyhow::bail!("{} field(s) need attention", errors.issues().len());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Render {
            answers,
            signature,
            logo,
            out,
        } => {
            let config = ClientConfig::from_overrides(None, cli.questionnaire, logo)?;
            let controller = load_controller(&config, &answers, signature.as_deref())?;
            let pdf = controller.render_transcript()?;
            std::fs::write(&out, &pdf).map_err(IntakeError::FileWrite)?;
            println!("Wrote {} ({} bytes)", out.display(), pdf.len());
        }
        Commands::Submit {
            answers,
            signature,
            logo,
            relay_url,
        } => {
            let config = ClientConfig::from_overrides(Some(relay_url), cli.questionnaire, logo)?;
            let mut controller = load_controller(&config, &answers, Some(&signature))?;
            let res = controller.submit().await?;
            println!("{}", res.message);
        }
    }

    Ok(())
}

/// Builds a controller and replays the answers file into it.
///
/// Answers go through the controller one by one, so upper-casing and visibility rules
/// apply exactly as they would when typed into the form.
fn load_controller(
    config: &ClientConfig,
    answers_path: &Path,
    signature_path: Option<&Path>,
) -> anyhow::Result<FormController<HttpRelayClient>> {
    let questionnaire = Arc::new(config.load_questionnaire()?);
    let renderer = match config.logo_path() {
        Some(path) => TranscriptRenderer::new().with_logo_path(path)?,
        None => TranscriptRenderer::new(),
    };
    let relay = HttpRelayClient::new(config.relay_url());
    let mut controller = FormController::new(questionnaire, renderer, relay);

    let answers = AnswerMap::from_json_path(answers_path)?;
    for (key, value) in answers.iter() {
        controller.answer(key, value)?;
    }

    if let Some(path) = signature_path {
        let png = std::fs::read(path).map_err(IntakeError::FileRead)?;
        controller.load_signature_png(&png)?;
    }

    Ok(controller)
}

fn describe(questionnaire: &Questionnaire) -> String {
    let mut out = format!("{} ({})\n", questionnaire.title, questionnaire.id);
    for field in &questionnaire.client_fields {
        let required = if field.required { " *" } else { "" };
        out.push_str(&format!("  [{}] {}{}\n", field.key, field.label, required));
    }
    for question in &questionnaire.questions {
        out.push_str(&format!("  [{}] {}\n", question.key, question.prompt));
        if !question.sub_questions.is_empty() {
            out.push_str(&format!(
                "      shown on: {}\n",
                question.reveal_on.join(", ")
            ));
        }
        for sub in &question.sub_questions {
            out.push_str(&format!("      [{}] {}\n", sub.key, sub.prompt));
        }
    }
    out.push_str(&format!(
        "  [{}] {}\n",
        questionnaire.remarks.key, questionnaire.remarks.label
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_answers(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn fluido_config() -> ClientConfig {
        ClientConfig::from_overrides(None, Some("fluido".into()), None).unwrap()
    }

    #[test]
    fn answers_file_is_replayed_through_the_controller() {
        let file = write_answers(
            r#"{"cliente": "Maria", "placa": "abc1d23", "fluido": "Sim", "kmUltimaTroca": 80000}"#,
        );
        let controller = load_controller(&fluido_config(), file.path(), None).unwrap();
        assert_eq!(controller.answers().get("placa"), Some("ABC1D23"));
        assert_eq!(controller.answers().get("kmUltimaTroca"), Some("80000"));
        assert!(controller.visibility().is_visible("fluido"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_answers(r#"{"nope": "x"}"#);
        let err = load_controller(&fluido_config(), file.path(), None)
            .err()
            .expect("unknown key");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn incomplete_answers_fail_validation() {
        let file = write_answers(r#"{"cliente": "Maria"}"#);
        let controller = load_controller(&fluido_config(), file.path(), None).unwrap();
        assert!(matches!(
            controller.validate(),
            Err(IntakeError::Validation(_))
        ));
    }

    #[test]
    fn render_without_signature_produces_pdf() {
        let file = write_answers(r#"{"cliente": "Maria", "placa": "ABC1D23"}"#);
        let controller = load_controller(&fluido_config(), file.path(), None).unwrap();
        let pdf = controller.render_transcript().unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn schema_description_lists_rules() {
        let q = Questionnaire::builtin("transmissao").unwrap();
        let text = describe(&q);
        assert!(text.contains("[placa]"));
        assert!(text.contains("[11.1]"));
        assert!(text.contains("shown on: Não"));
        assert!(text.contains("shown on: Sim"));
    }
}
