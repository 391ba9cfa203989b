//! Command-line interface for medalforge.
//!
//! Provides commands for generating propositions, listing the files of a
//! job and inspecting the resolved configuration.
//!
//! `generate` writes one JSON object per line to stdout: every progress event
//! as it happens, then the final result. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::GeminiGenerator;
use crate::config::{load_config, ResolvedConfig, MAX_PROPOSITIONS};
use crate::core::{
    output_id_for, GenerationPipeline, ProgressLog, RunOptions, PROGRESS_LOG_FILE,
};
use crate::domain::{
    FanOut, GenerationRequest, GenerationResult, ProgressEvent, ProgressSink, ReferenceImage,
    SupplementaryFile,
};
use crate::storage::{LocalStorage, Storage};

/// medalforge - Medal mockup generator
#[derive(Parser, Debug)]
#[command(name = "medalforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate design propositions for an event
    Generate {
        /// Event name (e.g. "Ultra Trail des Volcans 2026")
        #[arg(short, long)]
        label: String,

        /// Design brief
        #[arg(short, long)]
        description: String,

        /// Reference image (repeatable)
        #[arg(short, long = "reference")]
        references: Vec<PathBuf>,

        /// Supplementary file: text notes or extra images (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Override the number of propositions
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_PROPOSITIONS as i64))]
        propositions: Option<u32>,
    },

    /// List the files of a job folder
    Outputs {
        /// Job identifier printed by `generate`
        output_id: String,

        /// Glob pattern on file names
        #[arg(short, long, default_value = "*")]
        pattern: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// One line of the `generate` output stream
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamMessage<'a> {
    Progress(&'a ProgressEvent),
    Result(&'a GenerationResult),
}

/// Prints every event to stdout as one JSON line
struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&self, event: ProgressEvent) {
        print_message(&StreamMessage::Progress(&event));
    }
}

fn print_message(message: &StreamMessage<'_>) {
    match serde_json::to_string(message) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "Failed to serialize stream message"),
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = load_config()?;

        match self.command {
            Commands::Generate {
                label,
                description,
                references,
                files,
                propositions,
            } => {
                generate(&config, label, description, references, files, propositions).await
            }
            Commands::Outputs { output_id, pattern } => {
                list_outputs(&config, &output_id, &pattern).await
            }
            Commands::Config => show_config(&config),
        }
    }
}

/// Run the pipeline against the configured provider
async fn generate(
    config: &ResolvedConfig,
    label: String,
    description: String,
    references: Vec<PathBuf>,
    files: Vec<PathBuf>,
    propositions: Option<u32>,
) -> Result<()> {
    let mut request = GenerationRequest::new(label, description);

    for path in &references {
        let (name, data) = read_attachment(path).await?;
        request = request.with_reference(ReferenceImage::new(name, data, media_type_for(path)));
    }

    for path in &files {
        let (name, data) = read_attachment(path).await?;
        request = request.with_file(SupplementaryFile::new(name, data, media_type_for(path)));
    }

    let mut settings = config.generator.clone();
    if let Some(count) = propositions {
        settings.propositions_count = count;
    }

    let generator = Arc::new(GeminiGenerator::new(config.gemini()?));
    let storage = Arc::new(LocalStorage::new(&config.output_dir));
    let pipeline = GenerationPipeline::new(generator, storage, settings);

    let output_id = output_id_for(&request.event_label);
    let (log, writer) = ProgressLog::spawn(config.output_dir.join(&output_id).join(PROGRESS_LOG_FILE));
    let sink = FanOut::new().with(Arc::new(StdoutSink)).with(Arc::new(log));

    let options = RunOptions {
        output_id: Some(output_id),
        ..Default::default()
    };

    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current call");
            cancel.cancel();
        }
    });

    let outcome = pipeline.generate_with(request, &sink, options).await;

    drop(sink);
    let log_path = writer.path().display().to_string();
    match writer.finish().await {
        Ok(count) => info!(events = count, path = %log_path, "Progress log written"),
        Err(e) => warn!(error = %e, "Progress log incomplete"),
    }

    let report = outcome?;
    print_message(&StreamMessage::Result(&report.result));

    if !report.result.succeeded {
        std::process::exit(2);
    }

    Ok(())
}

/// List the files of a job folder
async fn list_outputs(config: &ResolvedConfig, output_id: &str, pattern: &str) -> Result<()> {
    let storage = LocalStorage::new(&config.output_dir);
    let files = storage.list_files(Path::new(output_id), pattern).await?;

    if files.is_empty() {
        println!("No files found in {}", storage.root().join(output_id).display());
        return Ok(());
    }

    for file in files {
        println!("{}", file);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("Config file: {}", match &config.config_file {
        Some(path) => path.display().to_string(),
        None => "(none)".to_string(),
    });
    println!("Output dir:  {}", config.output_dir.display());
    println!("Model:       {}", config.model);
    println!("Base URL:    {}", config.base_url);

    let key_state = if std::env::var(&config.api_key_env).is_ok() {
        "set"
    } else {
        "missing"
    };
    println!("API key:     ${} ({})", config.api_key_env, key_state);

    let generation = &config.generator;
    println!("\nGeneration:");
    println!("  propositions:         {}", generation.propositions_count);
    println!("  timeout:              {}ms", generation.timeout_ms);
    println!("  delay:                {}ms", generation.delay_ms);
    println!("  product category:     {}", generation.product_category);
    println!("  max reference images: {}", generation.max_reference_images);
    println!("  access URL template:  {}", generation.access_url_template);

    Ok(())
}

async fn read_attachment(path: &Path) -> Result<(String, Vec<u8>)> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    Ok((name, data))
}

/// Guess a media type from the file extension
fn media_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
    .to_string()
}
