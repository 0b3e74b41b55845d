use crate::browser::{BrowserSession, LaunchOptions};
use crate::config::ChunkerConfig;
use crate::content_script::ContentScript;
use crate::host::MemoryHost;
use crate::surface::TabSurface;
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) type PageScript = ContentScript<TabSurface, MemoryHost>;

pub(crate) struct ServerState {
    pub(crate) browser: BrowserSession,
    pub(crate) script: PageScript,
}

/// MCP server acting as the host panel for one browser tab
#[derive(Clone)]
pub struct ChunkServer {
    state: Arc<Mutex<ServerState>>,
    config: ChunkerConfig,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl ChunkServer {
    pub fn with_options(options: LaunchOptions, config: ChunkerConfig) -> crate::error::Result<Self> {
        config.validate()?;
        let browser = BrowserSession::launch(options)?;
        let script = browser.content_script(MemoryHost::new(), config.clone())?;

        Ok(Self {
            state: Arc::new(Mutex::new(ServerState { browser, script })),
            config,
            tool_router: Self::tool_router(),
        })
    }

    pub fn new() -> crate::error::Result<Self> {
        Self::with_options(LaunchOptions::default(), ChunkerConfig::default())
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}

#[tool_handler]
impl ServerHandler for ChunkServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Splits the current page into keyboard-navigable chunks. Call chunk_webpage after \
                 browser_navigate, then press_key / pump_page_events to navigate and select, and \
                 get_selected_chunks or get_selection_update to read the selection."
                    .to_string(),
            ),
        }
    }
}
