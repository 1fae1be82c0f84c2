use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use recipe_core::ocr::TesseractRecognizer;
use recipe_core::video::FfmpegDecoder;
use recipe_core::{AppState, BackendConfig, Config};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::commands::{self, ImportOptions};

#[derive(Parser, Debug)]
#[command(name = "recipe")]
#[command(about = "Turn photographed, scanned or filmed recipes into structured recipes")]
pub struct Args {
    /// Settings file (defaults to settings.json in the data directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import recipe documents (png, jpg, pdf, txt, mov, mp4)
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Category to file the recipes under
        #[arg(long)]
        category: Option<String>,

        /// Image attached to recipes imported from text files
        #[arg(long)]
        cover: Option<PathBuf>,

        /// Classification service base URL (e.g. http://localhost:5000)
        #[arg(long)]
        backend_url: Option<String>,
    },

    /// Split a text file into ingredients and instructions with keyword heuristics
    Segment { file: PathBuf },

    /// Label every line of a text file
    Classify {
        file: PathBuf,

        /// Classification service base URL; heuristics are used without one
        #[arg(long)]
        backend_url: Option<String>,
    },
}

/// Run a command and print its JSON result to stdout
pub fn run(args: Args) -> ExitCode {
    crate::init_logging(&["recipe=info"]);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(execute(args)) {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every input was processed successfully.
async fn execute(args: Args) -> anyhow::Result<bool> {
    let mut config = Config::load_or_default();
    if let Some(settings) = args.settings {
        config.settings_file = settings;
    }
    let mut state = AppState::new(config)?;

    match args.command {
        Command::Import {
            files,
            category,
            cover,
            backend_url,
        } => {
            apply_backend_url(&mut state, backend_url);

            let recognizer = Arc::new(TesseractRecognizer::new(&state.settings.ocr_language));
            let importer = state.importer(recognizer, Some(Arc::new(FfmpegDecoder::default())));

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, cancelling import");
                    ctrl_c.cancel();
                }
            });

            let options = ImportOptions {
                files,
                category,
                cover,
            };
            let reports = commands::import(&importer, options, &cancel).await?;
            let success = reports.iter().all(|report| report.error.is_none());
            print_json(&reports)?;
            Ok(success)
        }
        Command::Segment { file } => {
            print_json(&commands::segment(&file).await?)?;
            Ok(true)
        }
        Command::Classify { file, backend_url } => {
            apply_backend_url(&mut state, backend_url);

            let recognizer = Arc::new(TesseractRecognizer::new(&state.settings.ocr_language));
            let importer = state.importer(recognizer, None);
            let lines = commands::classify(&importer, &file, &CancellationToken::new()).await?;
            print_json(&lines)?;
            Ok(true)
        }
    }
}

fn apply_backend_url(state: &mut AppState, backend_url: Option<String>) {
    if let Some(endpoint) = backend_url {
        state.settings.backend = BackendConfig::Remote { endpoint };
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
