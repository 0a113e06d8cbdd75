use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use form_core::{
    config::{load_settings_from, DEFAULT_SETTINGS_FILE},
    payload::extract_payload,
    FormConfig, FormController, FormKind, HttpSignupApi, InitialValues, SubmitOutcome,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// JSON file with initial form values (`username`, `password`, `password_confirm`).
    #[arg(long)]
    prefill: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the administrator account of a new instance.
    FirstRun(FormArgs),
    Signup(FormArgs),
}

#[derive(Args, Debug)]
struct FormArgs {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Defaults to the password.
    #[arg(long)]
    password_confirm: Option<String>,
}

fn read_prefill(path: Option<&PathBuf>) -> Result<InitialValues> {
    let Some(path) = path else {
        return Ok(InitialValues::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read prefill file '{}'", path.display()))?;
    let initial = extract_payload::<InitialValues>(Some(&raw))
        .with_context(|| format!("invalid prefill file '{}'", path.display()))?;
    Ok(initial.unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings_from(&cli.config)?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }

    let (kind, args) = match cli.command {
        Command::FirstRun(args) => (FormKind::FirstRun, args),
        Command::Signup(args) => (FormKind::Signup, args),
    };
    let initial = read_prefill(cli.prefill.as_ref())?;

    let api = HttpSignupApi::from_settings(&settings)?;
    info!(server_url = %api.base_url(), %kind, "starting account form");
    let controller = FormController::new(
        FormConfig::from_settings(kind, &settings).with_initial(initial.clone()),
        Arc::new(api),
    );

    let mut events = controller.subscribe_events();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    for line in render::render_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    controller.mount();

    let username = args.username.unwrap_or(initial.username);
    let password = args.password.unwrap_or(initial.password);
    let password_confirm = args
        .password_confirm
        .or_else(|| Some(initial.password_confirm).filter(|c| !c.is_empty()))
        .unwrap_or_else(|| password.clone());

    controller.on_username_input(username).await;
    controller.check_username_available().await;
    controller.on_password_input(password).await;
    controller.check_password_strength().await;
    controller.on_password_confirm_input(password_confirm).await;
    controller.validate_confirmation().await;

    let outcome = controller.submit().await;
    let final_state = controller.snapshot().await;
    drop(controller);
    let _ = renderer.await;

    match outcome {
        SubmitOutcome::Completed { .. } => Ok(()),
        _ => {
            let errors = final_state
                .field_errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect::<Vec<_>>()
                .join("; ");
            bail!("account was not created: {errors}")
        }
    }
}
