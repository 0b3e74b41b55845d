use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound message from the host, tagged by its `action` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    ChunkWebpage,
    ClearChunkSelections,
    GetSelectedChunks,
    ExitChunkNavigation,
    GetCurrentActiveChunk,
    #[serde(rename_all = "camelCase")]
    ReplaceChunkText {
        /// Signed so out-of-range values from the host are rejected, not truncated
        chunk_index: i64,
        translated_text: String,
    },
    DetectImages,
    #[serde(rename_all = "camelCase")]
    FocusOnImage { image_id: String },
    Ping,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ChunkWebpage => "chunkWebpage",
            Command::ClearChunkSelections => "clearChunkSelections",
            Command::GetSelectedChunks => "getSelectedChunks",
            Command::ExitChunkNavigation => "exitChunkNavigation",
            Command::GetCurrentActiveChunk => "getCurrentActiveChunk",
            Command::ReplaceChunkText { .. } => "replaceChunkText",
            Command::DetectImages => "detectImages",
            Command::FocusOnImage { .. } => "focusOnImage",
            Command::Ping => "ping",
        }
    }
}

/// Reply to a [`Command`]: `{"success": bool, ...data}` plus `"error"` on failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Success carrying the fields of a JSON object. Non-object values land under `data`.
    pub fn success_with(data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Map::new(),
            error: Some(message.into()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_parsing() {
        let cmd: Command = serde_json::from_value(json!({"action": "chunkWebpage"})).unwrap();
        assert_eq!(cmd, Command::ChunkWebpage);

        let cmd: Command = serde_json::from_value(json!({
            "action": "replaceChunkText",
            "chunkIndex": -1,
            "translatedText": "Bonjour"
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::ReplaceChunkText {
                chunk_index: -1,
                translated_text: "Bonjour".to_string()
            }
        );

        let cmd: Command = serde_json::from_value(json!({"action": "focusOnImage", "imageId": "img_0_1"})).unwrap();
        assert_eq!(cmd.name(), "focusOnImage");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let parsed = serde_json::from_value::<Command>(json!({"action": "selfDestruct"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_result_serialization() {
        let ok = CommandResult::success_with(json!({"chunkCount": 3}));
        assert_eq!(ok.to_value(), json!({"success": true, "chunkCount": 3}));

        let failed = CommandResult::failure("Invalid chunk index");
        assert_eq!(failed.to_value(), json!({"success": false, "error": "Invalid chunk index"}));

        assert_eq!(CommandResult::success().to_value(), json!({"success": true}));
    }

    #[test]
    fn test_result_round_trips_flattened_data() {
        let parsed: CommandResult =
            serde_json::from_value(json!({"success": true, "chunkText": null, "chunkIndex": null})).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.get("chunkIndex"), Some(&Value::Null));
        assert!(parsed.error.is_none());
    }
}
