use crate::dom::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a chunk holds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChunkType {
    Heading,
    Image,
    /// A leftover `div` admitted by the remaining-content sweep
    ContentDiv,
    /// Any other block, named by its tag
    Tag(String),
}

impl ChunkType {
    pub fn as_str(&self) -> &str {
        match self {
            ChunkType::Heading => "heading",
            ChunkType::Image => "image",
            ChunkType::ContentDiv => "content-div",
            ChunkType::Tag(tag) => tag,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "heading" => ChunkType::Heading,
            "image" => ChunkType::Image,
            "content-div" => ChunkType::ContentDiv,
            other => ChunkType::Tag(other.to_string()),
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChunkType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChunkType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ChunkType::parse(&value))
    }
}

/// A navigable, selectable unit of page content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `chunk-<index>`, unique within a chunking session
    pub id: String,

    /// Snapshot node the chunk was anchored to at assembly time.
    /// Only meaningful against the snapshot that produced it; live lookups go through [`Chunk::selector`].
    #[serde(skip)]
    pub node: Option<NodeId>,

    pub text: String,

    #[serde(rename = "type")]
    pub chunk_type: ChunkType,

    /// Heading level for heading chunks, 0 otherwise
    pub level: u8,

    /// Position in the final sequence
    pub index: usize,
}

impl Chunk {
    pub fn id_for(index: usize) -> String {
        format!("chunk-{}", index)
    }

    /// Selector that resolves the chunk's element in the marked-up page
    pub fn selector(&self) -> String {
        selector_for(&self.id)
    }

    pub fn is_heading(&self) -> bool {
        self.chunk_type == ChunkType::Heading
    }

    pub fn is_image(&self) -> bool {
        self.chunk_type == ChunkType::Image
    }
}

/// Attribute selector for a chunk id
pub fn selector_for(chunk_id: &str) -> String {
    format!("[data-chunk-id=\"{}\"]", chunk_id)
}

/// Provisional chunk produced before finalization
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    /// Element the chunk will be anchored to
    pub node: NodeId,
    /// First contributing node; orders drafts in document order
    pub origin: NodeId,
    pub text: String,
    pub chunk_type: ChunkType,
    pub level: u8,
}

impl ChunkDraft {
    pub fn standalone(node: NodeId, text: impl Into<String>, chunk_type: ChunkType) -> Self {
        Self {
            node,
            origin: node,
            text: text.into(),
            chunk_type,
            level: 0,
        }
    }

    pub fn is_heading(&self) -> bool {
        self.chunk_type == ChunkType::Heading
    }

    pub fn is_image(&self) -> bool {
        self.chunk_type == ChunkType::Image
    }

    /// Append another text body separated by a blank line
    pub fn append_text(&mut self, text: &str) {
        if self.text.is_empty() {
            self.text.push_str(text);
        } else {
            self.text.push_str("\n\n");
            self.text.push_str(text);
        }
    }
}
