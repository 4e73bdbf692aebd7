use std::{
    path::PathBuf,
    sync::{Arc, Weak},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings},
    credentials::{self, CredentialSource, CredentialStore},
    i18n::{self, detect_language},
    media::import_reference_file,
    GeminiClient, ScriptOutcome, SessionEvent, StoryboardController, StoryboardSession,
};
use shared::domain::{ImageResolution, Language, StoryboardData};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storyboard", about = "Turn a story idea into a shot-by-shot storyboard")]
struct Cli {
    /// Manual API key. `API_KEY` / `GEMINI_API_KEY` in the environment still win.
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Output language (`en` or `zh`); defaults to config, then the locale.
    #[arg(long, global = true)]
    language: Option<Language>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite a short idea into a richer story prompt.
    Enhance { idea: String },
    /// Generate a storyboard, optionally render and export its frames.
    Create(CreateArgs),
    /// Manage the stored API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    idea: String,
    /// Reference image for character consistency; repeatable.
    #[arg(long = "ref", value_name = "FILE")]
    references: Vec<PathBuf>,
    /// Enhance the idea before generating the script.
    #[arg(long)]
    enhance: bool,
    /// Continuation instruction; each occurrence appends more scenes.
    #[arg(long = "continue", value_name = "TEXT", num_args = 0..=1, default_missing_value = "")]
    continuations: Vec<String>,
    /// Render every scene and export the frames.
    #[arg(long)]
    images: bool,
    #[arg(long)]
    resolution: Option<ImageResolution>,
    /// Parent directory for exported frames.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    Set { key: String },
    Clear,
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let settings = load_settings()?;
    let language = cli
        .language
        .or(settings.language)
        .unwrap_or_else(detect_language);

    match cli.command {
        Command::Key { action } => run_key(action, cli.api_key.as_deref(), language),
        Command::Enhance { idea } => {
            let controller = build_controller(&settings, cli.api_key.as_deref(), language, None)?;
            controller.with_session(|s| s.set_prompt(idea)).await;
            let enhanced = controller.enhance_prompt().await?;
            println!("{enhanced}");
            Ok(())
        }
        Command::Create(args) => {
            let resolution = args.resolution.unwrap_or(settings.resolution);
            let controller = build_controller(
                &settings,
                cli.api_key.as_deref(),
                language,
                Some(resolution),
            )?;
            let printer = spawn_event_printer(&controller);
            let interrupt = spawn_interrupt_handler(Arc::downgrade(&controller));
            let out = args.out.clone().unwrap_or_else(|| settings.output_dir.clone());

            let result = run_create(&controller, args, out).await;

            interrupt.abort();
            drop(controller);
            let _ = printer.await;
            result
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "info";

/// `RUST_LOG` directives when they parse, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn stored_key() -> Option<String> {
    let store = CredentialStore::default_location().ok()?;
    match store.load() {
        Ok(key) => key,
        Err(err) => {
            warn!(error = %err, "cli: ignoring unreadable credential file");
            None
        }
    }
}

fn build_controller(
    settings: &Settings,
    manual_key: Option<&str>,
    language: Language,
    resolution: Option<ImageResolution>,
) -> Result<Arc<StoryboardController>> {
    let Some((key, source)) =
        credentials::resolve_api_key(credentials::env_api_key(), manual_key, stored_key())
    else {
        bail!(i18n::messages(language).key_missing);
    };
    info!(?source, "cli: api key resolved");
    let backend = GeminiClient::from_settings(settings, Some(key))?;
    let session =
        StoryboardSession::new(language, resolution.unwrap_or(settings.resolution));
    Ok(StoryboardController::new(Arc::new(backend), session))
}

fn spawn_event_printer(controller: &StoryboardController) -> JoinHandle<()> {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Notice(notice)) => eprintln!("! {}", notice.message),
                Ok(SessionEvent::ImageUpdated { index }) => {
                    info!(index, "cli: frame updated");
                }
                Ok(SessionEvent::BatchFinished(report)) => eprintln!(
                    "frames: {} generated, {} failed, {} skipped{}",
                    report.generated,
                    report.failed,
                    report.skipped,
                    if report.cancelled { " (stopped)" } else { "" }
                ),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "cli: event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Ctrl-C stops whatever is running: a pending script is discarded, a batch
/// halts after its in-flight frame.
fn spawn_interrupt_handler(controller: Weak<StoryboardController>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            let Some(controller) = controller.upgrade() else {
                return;
            };
            let messages = i18n::messages(controller.session().await.language());
            if controller.is_batch_running() {
                eprintln!("{}", messages.stop_all);
                controller.cancel_images();
            } else {
                eprintln!("{}", messages.stop);
                controller.cancel_script();
            }
        }
    })
}

async fn run_create(
    controller: &StoryboardController,
    args: CreateArgs,
    out: PathBuf,
) -> Result<()> {
    let mut references = Vec::with_capacity(args.references.len());
    for path in &args.references {
        references.push(import_reference_file(path)?);
    }
    controller
        .with_session(|session| {
            session.set_prompt(args.idea);
            for reference in references {
                session.add_reference_image(reference);
            }
        })
        .await;

    if args.enhance {
        let enhanced = controller.enhance_prompt().await?;
        eprintln!("{enhanced}\n");
    }

    match controller
        .generate_script()
        .await
        .context("script generation failed")?
    {
        ScriptOutcome::Generated { scenes } => info!(scenes, "cli: script ready"),
        ScriptOutcome::Cancelled => return Ok(()),
    }

    for text in args.continuations {
        controller
            .with_session(|session| session.set_continuation_text(text))
            .await;
        eprintln!("{}", i18n::messages(controller.session().await.language()).continuing);
        controller
            .continue_script()
            .await
            .context("script continuation failed")?;
    }

    let (storyboard, language) = {
        let session = controller.session().await;
        (session.storyboard().cloned(), session.language())
    };
    let Some(storyboard) = storyboard else {
        return Ok(());
    };
    print_storyboard(&storyboard, language);

    if args.images {
        eprintln!(
            "{} {} ...",
            i18n::messages(language).rendering,
            storyboard.scenes.len()
        );
        controller.generate_all_images().await?;
        let summary = controller.export_all(&out).await?;
        println!(
            "{} {} -> {}",
            i18n::messages(language).exported,
            summary.files.len(),
            summary.directory.display()
        );
    }
    Ok(())
}

fn print_storyboard(storyboard: &StoryboardData, language: Language) {
    let messages = i18n::messages(language);
    println!("# {}", storyboard.title);
    println!("{} {}\n", messages.style_label, storyboard.art_style);
    for scene in &storyboard.scenes {
        println!(
            "## {} {}: {} [{}]",
            messages.frame, scene.scene_number, scene.title, scene.camera_shot
        );
        println!("{}", scene.narrative_script);
        println!("> {}\n", scene.visual_prompt);
    }
}

fn run_key(action: KeyAction, manual_key: Option<&str>, language: Language) -> Result<()> {
    let messages = i18n::messages(language);
    let store = CredentialStore::default_location()?;
    match action {
        KeyAction::Set { key } => {
            store.save(&key)?;
            println!("{}", messages.key_saved);
        }
        KeyAction::Clear => {
            if store.clear()? {
                println!("{}", messages.key_cleared);
            }
        }
        KeyAction::Status => {
            let stored = store
                .load()
                .with_context(|| format!("reading {}", store.path().display()))?;
            match credentials::resolve_api_key(credentials::env_api_key(), manual_key, stored) {
                Some((_, CredentialSource::Environment)) => println!("environment"),
                Some((_, CredentialSource::Manual)) => println!("command line"),
                Some((_, CredentialSource::Stored)) => {
                    println!("stored ({})", store.path().display())
                }
                None => println!("{}", messages.key_missing),
            }
        }
    }
    Ok(())
}
