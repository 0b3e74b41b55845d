use crate::chunking::chunk::{ChunkDraft, ChunkType};
use crate::dom::{DomTree, NodeId};

/// Label used when an image has neither `alt` nor `title`
pub const UNTITLED_IMAGE: &str = "untitled";

/// A detected image ready to become a chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub node: NodeId,
    /// Source as reported by the detector
    pub src: String,
}

impl ImageSource {
    pub fn new(node: NodeId, src: impl Into<String>) -> Self {
        Self { node, src: src.into() }
    }
}

/// Build one standalone draft per image
pub fn image_drafts(tree: &DomTree, images: &[ImageSource]) -> Vec<ChunkDraft> {
    images
        .iter()
        .filter(|image| tree.contains(image.node))
        .map(|image| {
            let element = tree.element(image.node);
            let label = [element.get_attribute("alt"), element.get_attribute("title")]
                .into_iter()
                .flatten()
                .map(|value| value.trim())
                .find(|value| !value.is_empty())
                .unwrap_or(UNTITLED_IMAGE);
            ChunkDraft::standalone(image.node, image_text(label, &image.src), ChunkType::Image)
        })
        .collect()
}

pub fn image_text(label: &str, src: &str) -> String {
    format!("[Image: {}] - {}", label, src)
}
