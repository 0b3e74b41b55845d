//! Command-line host for the page chunker

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use page_chunker::browser::{BrowserSession, LaunchOptions};
use page_chunker::config::ChunkerConfig;
use page_chunker::host::{ChannelHost, Command, Notification, NullHost};
use page_chunker::surface::MemorySurface;
use page_chunker::ContentScript;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "page-chunker")]
#[command(version)]
#[command(about = "Split web pages into keyboard-navigable chunks", long_about = None)]
struct Cli {
    /// Chunker configuration file (JSON)
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', global = true)]
    headed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunks of a page as JSON
    Chunk {
        /// Page to load
        url: Option<String>,

        /// Chunk a local HTML file instead of a live page
        #[arg(long, value_name = "HTML", conflicts_with = "url")]
        file: Option<PathBuf>,
    },
    /// Print the meaningful images of a page as JSON
    Images { url: String },
    /// Open the page in a visible browser and navigate its chunks with the keyboard
    Navigate {
        url: String,

        /// How often to poll the page for key presses
        #[arg(long, default_value = "100", value_name = "MS")]
        poll_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ChunkerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ChunkerConfig::default(),
    };

    match cli.command {
        Commands::Chunk { url: _, file: Some(file) } => {
            let html = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let mut script = ContentScript::new(MemorySurface::from_html(&html)?, NullHost, config)?;
            ensure_success(script.dispatch(Command::ChunkWebpage))?;
            println!("{}", serde_json::to_string_pretty(script.chunks())?);
        }
        Commands::Chunk { url: Some(url), file: None } => {
            let browser = launch(&url, !cli.headed)?;
            let mut script = browser.content_script(NullHost, config)?;
            ensure_success(script.dispatch(Command::ChunkWebpage))?;
            println!("{}", serde_json::to_string_pretty(script.chunks())?);
        }
        Commands::Chunk { url: None, file: None } => bail!("Either a URL or --file is required"),
        Commands::Images { url } => {
            let browser = launch(&url, !cli.headed)?;
            let mut script = browser.content_script(NullHost, config)?;
            let result = ensure_success(script.dispatch(Command::DetectImages))?;
            let images = result.get("images").cloned().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&images)?);
        }
        Commands::Navigate { url, poll_ms } => {
            // Keyboard navigation needs a window to type into
            let browser = launch(&url, false)?;
            let (tx, rx) = mpsc::channel();
            let mut script = browser.content_script(ChannelHost::new(tx), config)?;

            let result = ensure_success(script.dispatch(Command::ChunkWebpage))?;
            log::info!(
                "Page has {} chunks. Tab/Shift+Tab to move, Enter/Space to select, Escape to exit.",
                result.get("chunkCount").cloned().unwrap_or_default()
            );

            loop {
                if let Err(e) = script.pump_events() {
                    log::info!("Page closed: {}", e);
                    break;
                }
                for Notification::ChunkSelectionUpdate(update) in rx.try_iter() {
                    log::info!("{} of {} chunks selected", update.selected_count, update.total_chunks);
                    println!("{}", serde_json::to_string(&update.selected_texts)?);
                }
                std::thread::sleep(Duration::from_millis(poll_ms));
            }
        }
    }

    Ok(())
}

fn launch(url: &str, headless: bool) -> anyhow::Result<BrowserSession> {
    let browser = BrowserSession::launch(LaunchOptions::new().headless(headless))?;
    browser.navigate(url)?;
    Ok(browser)
}

fn ensure_success(result: page_chunker::host::CommandResult) -> anyhow::Result<page_chunker::host::CommandResult> {
    if result.success {
        Ok(result)
    } else {
        bail!(result.error.unwrap_or_else(|| "Unknown error".to_string()))
    }
}
