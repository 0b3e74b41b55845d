//! MCP (Model Context Protocol) host for the content script
//!
//! Each tool maps onto one [`Command`] or page event, so an MCP client can drive
//! chunking, keyboard navigation and selection the way a browser side panel would.

pub mod handler;
pub use handler::ChunkServer;

use crate::host::{Command, CommandResult};
use crate::navigation::{Key, KeyEvent};
use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
    /// Chunk the page once it has loaded (default: true)
    #[serde(default = "default_true")]
    pub chunk: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReplaceTextParams {
    /// Index of the chunk to rewrite
    pub chunk_index: i64,
    /// Replacement text, typically a translation
    pub translated_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FocusImageParams {
    /// Id returned by detect_images
    pub image_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PressKeyParams {
    /// tab, enter, space or escape
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
}

fn default_true() -> bool {
    true
}

fn json_result(value: serde_json::Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

/// Convert a command reply to an MCP tool result
fn convert_result(result: CommandResult) -> Result<CallToolResult, McpError> {
    if result.success {
        Ok(json_result(result.to_value()))
    } else {
        let error_msg = result.error.unwrap_or_else(|| "Unknown error".to_string());
        Err(McpError::internal_error(error_msg, None))
    }
}

impl ChunkServer {
    fn run(&self, command: Command) -> Result<CallToolResult, McpError> {
        convert_result(self.state().script.dispatch(command))
    }
}

#[tool_router]
impl ChunkServer {
    #[tool(description = "Navigate the browser to a URL, starting a fresh chunking session")]
    fn browser_navigate(&self, params: Parameters<NavigateParams>) -> Result<CallToolResult, McpError> {
        let mut state = self.state();
        state
            .browser
            .navigate(&params.0.url)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let script = state
            .browser
            .content_script(crate::host::MemoryHost::new(), self.config().clone())
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        state.script = script;

        if params.0.chunk {
            return convert_result(state.script.dispatch(Command::ChunkWebpage));
        }
        Ok(json_result(json!({ "success": true, "url": params.0.url })))
    }

    #[tool(description = "Split the current page into navigable chunks and focus the first one")]
    fn chunk_webpage(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::ChunkWebpage)
    }

    #[tool(description = "Deselect every chunk")]
    fn clear_chunk_selections(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::ClearChunkSelections)
    }

    #[tool(description = "Get the texts of the selected chunks")]
    fn get_selected_chunks(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::GetSelectedChunks)
    }

    #[tool(description = "Leave chunk navigation, keeping the selection")]
    fn exit_chunk_navigation(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::ExitChunkNavigation)
    }

    #[tool(description = "Get the text and index of the focused chunk")]
    fn get_current_active_chunk(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::GetCurrentActiveChunk)
    }

    #[tool(description = "Replace the text of a chunk in the page")]
    fn replace_chunk_text(&self, params: Parameters<ReplaceTextParams>) -> Result<CallToolResult, McpError> {
        self.run(Command::ReplaceChunkText {
            chunk_index: params.0.chunk_index,
            translated_text: params.0.translated_text,
        })
    }

    #[tool(description = "Detect meaningful images on the page")]
    fn detect_images(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::DetectImages)
    }

    #[tool(description = "Scroll to a detected image and highlight it")]
    fn focus_on_image(&self, params: Parameters<FocusImageParams>) -> Result<CallToolResult, McpError> {
        self.run(Command::FocusOnImage {
            image_id: params.0.image_id,
        })
    }

    #[tool(description = "Check that the content script is loaded in the page")]
    fn ping(&self) -> Result<CallToolResult, McpError> {
        self.run(Command::Ping)
    }

    #[tool(description = "Send a navigation key (tab, enter, space, escape) to the chunk navigator")]
    fn press_key(&self, params: Parameters<PressKeyParams>) -> Result<CallToolResult, McpError> {
        let event = KeyEvent {
            key: params.0.key,
            shift: params.0.shift,
        };

        let mut state = self.state();
        let transition = state.script.handle_key(&event);
        let current = state.script.session().current_index();
        Ok(json_result(json!({
            "handled": transition.handled,
            "currentIndex": current,
            "selectionChanged": transition.selection_changed,
        })))
    }

    #[tool(description = "Handle keyboard and click events the user produced in the page")]
    fn pump_page_events(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state();
        let handled = state
            .script
            .pump_events()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(json_result(json!({ "handled": handled })))
    }

    #[tool(description = "Get the most recent chunk selection update sent to the host")]
    fn get_selection_update(&self) -> Result<CallToolResult, McpError> {
        let state = self.state();
        let value = match state.script.host().latest() {
            Some(notification) => serde_json::to_value(notification),
            None => serde_json::to_value(state.script.selection_update()),
        }
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(json_result(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_router_lists_every_tool() {
        let mut names: Vec<String> = ChunkServer::tool_router()
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "browser_navigate",
                "chunk_webpage",
                "clear_chunk_selections",
                "detect_images",
                "exit_chunk_navigation",
                "focus_on_image",
                "get_current_active_chunk",
                "get_selected_chunks",
                "get_selection_update",
                "ping",
                "press_key",
                "pump_page_events",
                "replace_chunk_text",
            ]
        );
    }

    #[test]
    fn test_failed_command_becomes_internal_error() {
        let err = convert_result(CommandResult::failure("Invalid chunk index")).unwrap_err();
        assert_eq!(err.message, "Invalid chunk index");

        let ok = convert_result(CommandResult::success()).unwrap();
        assert_eq!(ok.is_error, Some(false));
    }
}
