//! Page-chunker MCP Server
//!
//! Exposes chunking, keyboard navigation and selection of the current page as
//! MCP tools, acting as the host panel of the content script.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use page_chunker::browser::LaunchOptions;
use page_chunker::config::ChunkerConfig;
use page_chunker::mcp::ChunkServer;
use rmcp::{ServiceExt, transport::stdio};
use rmcp::transport::{
    sse_server::{SseServer, SseServerConfig},
    streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager},
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Standard input/output transport (default)
    Stdio,
    /// Server-Sent Events transport
    Sse,
    /// HTTP streamable transport
    Http,
}

#[derive(Parser)]
#[command(name = "mcp-server")]
#[command(version)]
#[command(about = "Page chunking MCP server", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Chunker configuration file (JSON)
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Transport type to use
    #[arg(long, short = 't', value_enum, default_value = "stdio")]
    transport: Transport,

    /// Port for SSE or HTTP transport (default: 3000)
    #[arg(long, short = 'p', default_value = "3000")]
    port: u16,

    /// SSE endpoint path (default: /sse)
    #[arg(long, default_value = "/sse")]
    sse_path: String,

    /// SSE POST path for messages (default: /message)
    #[arg(long, default_value = "/message")]
    sse_post_path: String,

    /// HTTP streamable endpoint path (default: /mcp)
    #[arg(long, default_value = "/mcp")]
    http_path: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // stdout carries the stdio transport, logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ChunkerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ChunkerConfig::default(),
    };

    let mut options = LaunchOptions::new().headless(!cli.headed);
    if let Some(path) = cli.executable_path.clone() {
        options = options.chrome_path(path);
    }
    if let Some(dir) = cli.user_data_dir.clone() {
        options = options.user_data_dir(dir);
    }

    log::info!("Page-chunker MCP Server v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Browser mode: {}", if options.headless { "headless" } else { "headed" });

    match cli.transport {
        Transport::Stdio => {
            log::info!("Ready to accept MCP connections via stdio");
            let service = ChunkServer::with_options(options, config).context("Failed to create chunk server")?;
            let server = service.serve(stdio()).await?;
            let quit_reason = server.waiting().await?;
            log::info!("Server quit with reason: {:?}", quit_reason);
            // Give browser destructors a moment to finish
            tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        }
        Transport::Sse => {
            let bind_addr = format!("127.0.0.1:{}", cli.port);
            let sse_config = SseServerConfig {
                bind: bind_addr.parse()?,
                sse_path: cli.sse_path.clone(),
                post_path: cli.sse_post_path.clone(),
                ct: CancellationToken::new(),
                sse_keep_alive: None,
            };

            let (sse_server, router) = SseServer::new(sse_config);

            // SSE connections share one browser
            let server = ChunkServer::with_options(options, config).context("Failed to create chunk server")?;
            let _cancellation_token = sse_server.with_service(move || server.clone());

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.sse_path);
            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            axum::serve(listener, router.into_make_service()).await?;
        }
        Transport::Http => {
            let bind_addr = format!("127.0.0.1:{}", cli.port);

            let service_factory = move || {
                ChunkServer::with_options(options.clone(), config.clone()).map_err(std::io::Error::other)
            };

            let http_service = StreamableHttpService::new(
                service_factory,
                LocalSessionManager::default().into(),
                Default::default(),
            );

            let router = axum::Router::new().nest_service(&cli.http_path, http_service);

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.http_path);
            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
