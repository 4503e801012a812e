use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use ratecon_core::config_file::{self, ConfigFile};
use ratecon_core::{
    Config, DEFAULT_API_BASE, ErrorKind, ExtractedText, Outcome, Pipeline, PromptBuilder,
    PromptTemplate, SourceDocument, extract_document, notices,
};
use ratecon_pdf_mupdf::MupdfBackend;

/// Rate Confirmation Extractor - turn broker rate confirmation PDFs into shipment summaries
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a shipment summary from a rate confirmation PDF.
    ///
    /// Exit status: 0 summary printed, 1 failed, 2 no text in PDF, 3 not a PDF.
    Extract {
        /// Path to the rate confirmation PDF
        file_path: PathBuf,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Print the text recovered from a PDF
    Text {
        /// Path to the PDF
        file_path: PathBuf,
    },

    /// Dry run: print the prompt that would be sent, without calling the provider
    Prompt {
        /// Path to the PDF
        file_path: PathBuf,
    },

    /// Print the built-in extraction template
    Template,
}

#[derive(Args, Debug, Default)]
struct ProviderArgs {
    /// LLM provider API key (default: $GROQ_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (default: $RATECON_API_BASE or Groq)
    #[arg(long)]
    api_base: Option<String>,

    /// Model identifier (default: $RATECON_MODEL or llama-3.1-8b-instant)
    #[arg(long)]
    model: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the completion even if it doesn't follow the summary layout
    #[arg(long)]
    no_validate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            file_path,
            provider,
        } => extract(&file_path, &provider).await,
        Command::Text { file_path } => text(&file_path).await,
        Command::Prompt { file_path } => prompt(&file_path).await,
        Command::Template => {
            let template = PromptTemplate::rate_confirmation();
            eprintln!("# template {}", template.version());
            println!("{}", template.body());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
    args: &ProviderArgs,
) -> Config {
    let mut config = file.apply_to(Config::default());

    if let Some(key) = env("GROQ_API_KEY") {
        config.api_key = Some(key);
    }
    if let Some(base) = env("RATECON_API_BASE") {
        config.api_base = base;
    }
    if let Some(model) = env("RATECON_MODEL") {
        config.model = model;
    }

    if let Some(ref key) = args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(ref base) = args.api_base {
        config.api_base = base.clone();
    }
    if let Some(ref model) = args.model {
        config.model = model.clone();
    }
    if let Some(secs) = args.timeout {
        config.request_timeout_secs = secs;
    }
    if args.no_validate {
        config.validate_layout = false;
    }
    config
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_document(path: &Path) -> anyhow::Result<SourceDocument> {
    let data = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok(SourceDocument::sniffed(data, filename))
}

fn backend(file: &ConfigFile) -> Arc<MupdfBackend> {
    Arc::new(MupdfBackend::from_config(
        &file.extraction.clone().unwrap_or_default(),
    ))
}

/// Extraction for the commands that never reach the provider. `Err` carries
/// the exit status after the notice has been printed.
async fn extract_offline(file_path: &Path) -> anyhow::Result<Result<ExtractedText, u8>> {
    let document = read_document(file_path)?;
    if !document.is_pdf() {
        eprintln!("{}", notices::REJECTED);
        return Ok(Err(3));
    }
    let text = extract_document(backend(&config_file::load_config()), document).await?;
    if text.is_empty() {
        eprintln!("{}", notices::NO_TEXT);
        return Ok(Err(2));
    }
    Ok(Ok(text))
}

async fn extract(file_path: &Path, args: &ProviderArgs) -> anyhow::Result<ExitCode> {
    let file = config_file::load_config();
    let config = resolve_config(&file, env_var, args);
    if config.api_key.is_none() && config.api_base == DEFAULT_API_BASE {
        anyhow::bail!("No API key configured. Set GROQ_API_KEY or pass --api-key.");
    }
    tracing::debug!(?config, "resolved configuration");

    let document = read_document(file_path)?;
    let pipeline = Pipeline::from_config(&config, backend(&file));
    let outcome = pipeline.run(document).await;

    match &outcome {
        Outcome::Completed(done) => println!("{}", done.text),
        _ => eprintln!("{}", outcome.reply()),
    }
    Ok(ExitCode::from(exit_status(&outcome)))
}

fn exit_status(outcome: &Outcome) -> u8 {
    match outcome.error_kind() {
        None => 0,
        Some(ErrorKind::EmptyExtraction) => 2,
        Some(ErrorKind::UnsupportedMediaType) => 3,
        Some(_) => 1,
    }
}

async fn text(file_path: &Path) -> anyhow::Result<ExitCode> {
    let text = match extract_offline(file_path).await? {
        Ok(text) => text,
        Err(status) => return Ok(ExitCode::from(status)),
    };
    eprintln!("# {} page(s) with text", text.page_count());
    println!("{}", text);
    Ok(ExitCode::SUCCESS)
}

async fn prompt(file_path: &Path) -> anyhow::Result<ExitCode> {
    let text = match extract_offline(file_path).await? {
        Ok(text) => text,
        Err(status) => return Ok(ExitCode::from(status)),
    };
    let prompt = PromptBuilder::new(PromptTemplate::rate_confirmation()).build(&text)?;
    println!("{}", prompt);
    Ok(ExitCode::SUCCESS)
}
