//! Livecast CLI - narrated live presentations
//!
//! Runs a scripted presentation that pauses between script beats to answer
//! live audience comments.

mod console;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use livecast_core::config::{Config, default_config};
use livecast_core::presenter::{ObserverSet, tracing_observer};
use livecast_core::{
    CommentBatcher, CommentSource, EmptyCommentSource, FileScriptSource, HttpCommentSource,
    HttpScriptSource, HttpTokenProvider, OpenAiRewriter, ScriptSource, SessionDriver,
    SessionEvent, SessionState, StaticTokenProvider, TokenProvider, split_into_chunks,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::{ConsolePresenter, textwrap};

#[derive(Parser)]
#[command(
    name = "livecast",
    version,
    about = "Narrated live presentations with audience commentary",
    long_about = "Speaks a prepared script chunk by chunk and answers live audience comments between chunks."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full presentation session on the console presenter
    Present(PresentArgs),
    /// Show how a script file is split into spoken chunks
    Chunk(ChunkArgs),
}

#[derive(Args)]
struct PresentArgs {
    /// Path to a TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Script file to present
    #[arg(long, value_name = "FILE", conflicts_with = "script_url")]
    script: Option<String>,

    /// Script service base URL
    #[arg(long, value_name = "URL")]
    script_url: Option<String>,

    /// Comment service base URL
    #[arg(long, value_name = "URL")]
    comments_url: Option<String>,

    /// Word budget per spoken chunk
    #[arg(long, value_name = "N")]
    max_words: Option<usize>,

    /// Pause before the greeting, in milliseconds
    #[arg(long, value_name = "MS")]
    warmup_ms: Option<u64>,

    /// Simulated speaking rate (0 disables pacing)
    #[arg(long, default_value = "2.5", value_name = "RATE")]
    words_per_second: f32,
}

#[derive(Args)]
struct ChunkArgs {
    /// Script file to chunk
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Word budget per chunk
    #[arg(long, default_value = "50", value_name = "N")]
    max_words: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug,hyper=info,reqwest=info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Present(args) => present(args).await,
        Command::Chunk(args) => chunk(args),
    }
}

fn chunk(args: ChunkArgs) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&args.file)?;
    let chunks = split_into_chunks(&content, args.max_words)?;

    println!();
    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "{} {}",
            format!("#{}", i + 1).bright_cyan().bold(),
            format!("({} words)", chunk.split_whitespace().count()).dimmed()
        );
        for line in textwrap(chunk, 66).lines() {
            println!("  {}", line);
        }
        println!();
    }
    println!("{} {}", "Chunks:".bold(), chunks.len());

    Ok(())
}

async fn present(args: PresentArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    // Get API configuration from environment
    let api_key = env::var("LLAMA_API_KEY")
        .or_else(|_| env::var("OPENAI_API_KEY"))
        .unwrap_or_else(|_| {
            eprintln!(
                "{}",
                "Warning: LLAMA_API_KEY not set. Comment rewriting may fail.".yellow()
            );
            String::new()
        });

    let rewriter = Arc::new(OpenAiRewriter::new(config.rewriter_config(api_key))?);

    let comments: Arc<dyn CommentSource> = match &config.comments.base_url {
        Some(url) => Arc::new(HttpCommentSource::new(
            url,
            Duration::from_secs(config.comments.timeout_secs),
        )?),
        None => {
            warn!("no comment service configured; presenting without live comments");
            Arc::new(EmptyCommentSource)
        }
    };

    let script: Arc<dyn ScriptSource> = match (&config.script.url, &config.script.path) {
        (Some(url), _) => Arc::new(HttpScriptSource::new(url, Duration::from_secs(30))?),
        (None, Some(path)) => Arc::new(FileScriptSource::new(path)),
        (None, None) => Arc::new(FileScriptSource::default()),
    };

    let tokens: Arc<dyn TokenProvider> = match &config.presenter.token_url {
        Some(url) => Arc::new(HttpTokenProvider::new(url, Duration::from_secs(30))?),
        None => Arc::new(StaticTokenProvider::new(
            env::var("LIVECAST_PRESENTER_TOKEN").unwrap_or_else(|_| "console".to_string()),
        )),
    };

    let presenter = Arc::new(
        ConsolePresenter::new(args.words_per_second)
            .with_observers(ObserverSet::new().with(tracing_observer())),
    );

    let batcher = CommentBatcher::new(comments, rewriter)
        .with_persona(config.persona())
        .with_closing_line(config.commentary_closing());

    let mut driver = SessionDriver::new(config.session_config(), presenter, tokens, script, batcher)?
        .with_callback(create_console_callback());

    let handle = driver.handle();
    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested");
            stopper.teardown().await;
        }
    });

    print_banner("Livecast - live presentation");

    let result = driver.run().await;
    handle.teardown().await;

    match result {
        Ok(report) => {
            println!("{}", "═".repeat(70).bright_blue());
            let headline = if report.cancelled {
                "  Presentation stopped.".yellow().bold()
            } else {
                "  Presentation concluded.".bright_green().bold()
            };
            println!("{}", headline);
            println!(
                "  {} chunks spoken, {} commentary, {} comments acknowledged",
                report.transcript.len(),
                report.commentary_delivered,
                report.comments_acknowledged
            );
            println!("{}", "═".repeat(70).bright_blue());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn apply_overrides(config: &mut Config, args: &PresentArgs) {
    if let Some(path) = &args.script {
        config.script.path = Some(path.clone());
        config.script.url = None;
    }
    if let Some(url) = &args.script_url {
        config.script.url = Some(url.clone());
        config.script.path = None;
    }
    if let Some(url) = &args.comments_url {
        config.comments.base_url = Some(url.clone());
    }
    if let Some(max_words) = args.max_words {
        config.presentation.max_words_per_chunk = max_words;
    }
    if let Some(warmup_ms) = args.warmup_ms {
        config.presentation.warmup_ms = warmup_ms;
    }
}

fn print_banner(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", title).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
}

/// Create a callback that prints session events to the console.
fn create_console_callback() -> Box<dyn Fn(SessionEvent) + Send + Sync> {
    Box::new(move |event: SessionEvent| match event {
        // Commentary windows open after every chunk; the queued banner covers them.
        SessionEvent::StateChanged { from, to }
            if from != SessionState::Interleaving && to != SessionState::Interleaving =>
        {
            println!("{}", format!("── {} ──", to.display_name()).dimmed());
        }
        SessionEvent::StateChanged { .. } => {}
        SessionEvent::CommentaryQueued { comments, .. } => {
            println!();
            println!(
                "{}",
                format!("  💬 Answering {} live comment(s)", comments)
                    .bright_magenta()
                    .bold()
            );
            println!();
        }
        SessionEvent::ChunkStarted(chunk) if chunk.is_commentary() => {
            print!("{} ", "▶".bright_cyan());
        }
        SessionEvent::ChunkStarted(_) | SessionEvent::ChunkDelivered(_) => {}
        SessionEvent::Finished { cancelled } => {
            if cancelled {
                println!("{}", "  Session stopped early.".yellow());
            }
        }
    })
}
