//! # page-chunker
//!
//! Splits a live web page into keyboard-navigable, selectable chunks of content,
//! driving Chrome over the DevTools Protocol (CDP).
//!
//! ## Features
//!
//! - **Chunking pipeline**: content-area detection, heading-scoped grouping, leftover
//!   sweep and image chunks, all running in Rust over an immutable DOM snapshot
//! - **Keyboard navigation**: Tab / Shift+Tab focus, Enter / Space selection and Escape,
//!   with screen-reader announcements
//! - **Image detection**: filters decorative images and reports meaningful ones,
//!   optionally to a remote analysis service
//! - **MCP Server**: exposes the whole command surface to MCP clients
//!
//! ## Running the MCP Server
//!
//! ```bash
//! cargo run --bin mcp-server --features mcp-server
//!
//! # With a visible browser and custom thresholds
//! cargo run --bin mcp-server --features mcp-server -- --headed --config chunker.json
//! ```
//!
//! ## Library Usage
//!
//! ### Chunking a live page
//!
//! ```rust,no_run
//! use page_chunker::{BrowserSession, ChunkerConfig, Command, LaunchOptions};
//! use page_chunker::host::NullHost;
//!
//! # fn main() -> page_chunker::Result<()> {
//! let browser = BrowserSession::launch(LaunchOptions::default())?;
//! browser.navigate("https://example.com")?;
//!
//! let mut script = browser.content_script(NullHost, ChunkerConfig::default())?;
//! let result = script.dispatch(Command::ChunkWebpage);
//! println!("{} chunks", result.get("chunkCount").unwrap_or(&0.into()));
//! # Ok(())
//! # }
//! ```
//!
//! ### Chunking HTML offline
//!
//! ```rust
//! use page_chunker::{ChunkerConfig, DomTree, chunk_document};
//!
//! # fn main() -> page_chunker::Result<()> {
//! let tree = DomTree::from_html(
//!     "<body><main><h1>Title</h1><p>A paragraph long enough to become a chunk.</p></main></body>",
//! )?;
//! let chunks = chunk_document(&tree, &[], &ChunkerConfig::default());
//! assert_eq!(chunks.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`chunking`]: the pure chunking pipeline
//! - [`content_script`]: command dispatch over a page surface and host channel
//! - [`navigation`]: keyboard navigation state machine
//! - [`session`]: per-page chunks, focus and selection
//! - [`surface`]: page surfaces (live tab, in-memory)
//! - [`host`]: commands, notifications and the reinjection handshake
//! - [`images`]: image detection, registry and background analysis
//! - [`dom`]: DOM snapshot and structural selectors
//! - [`browser`]: browser session management
//! - [`config`]: thresholds and runtime settings
//! - [`mcp`]: **Model Context Protocol server** (requires `mcp-handler` feature)

pub mod browser;
pub mod chunking;
pub mod config;
pub mod content_script;
pub mod dom;
pub mod error;
pub mod host;
pub mod images;
pub mod navigation;
pub mod session;
pub mod surface;

#[cfg(feature = "mcp-handler")]
pub mod mcp;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use chunking::{Chunk, ChunkType, chunk_document};
pub use config::{ChunkerConfig, ReadingOrder};
pub use content_script::ContentScript;
pub use dom::{DomTree, ElementNode, NodeId};
pub use error::{ChunkError, Result};
pub use host::{Command, CommandResult, HostChannel, Notification};
pub use session::ChunkingSession;
pub use surface::{MemorySurface, PageSurface, TabSurface};

#[cfg(feature = "mcp-handler")]
pub use mcp::ChunkServer;
#[cfg(feature = "mcp-handler")]
pub use rmcp::ServiceExt;
