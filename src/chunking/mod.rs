//! Chunking pipeline
//!
//! Partitions a [`DomTree`] snapshot into an ordered sequence of [`Chunk`]s:
//! - areas: locate the primary content containers
//! - extract: heading-led groups and standalone blocks per area
//! - assemble: leftover sweep, section grouping, dedup and filtering
//! - image_chunks: one standalone chunk per detected image
//!
//! Every stage is a pure function of the snapshot and the configuration, so the
//! same snapshot always yields the same chunk sequence.

pub mod areas;
pub mod assemble;
pub mod chunk;
pub mod classify;
pub mod extract;
pub mod image_chunks;

pub use chunk::{Chunk, ChunkDraft, ChunkType};
pub use image_chunks::ImageSource;

use crate::config::ChunkerConfig;
use crate::dom::{DomTree, NodeId};
use std::collections::BTreeSet;

/// Nodes already consumed by a chunk during one pipeline run
#[derive(Debug, Default, Clone)]
pub struct ClaimSet {
    nodes: BTreeSet<NodeId>,
}

impl ClaimSet {
    pub fn claim(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    pub fn is_claimed(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Whether the node or one of its ancestors is claimed
    pub fn covers(&self, tree: &DomTree, id: NodeId) -> bool {
        tree.ancestors_or_self(id).any(|node| self.nodes.contains(&node))
    }

    /// Whether any strict descendant of the node is claimed
    pub fn has_claimed_descendant(&self, tree: &DomTree, id: NodeId) -> bool {
        let end = tree.subtree_end(id);
        self.nodes.range(NodeId(id.0 + 1)..NodeId(end)).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Run the full pipeline over a snapshot
pub fn chunk_document(tree: &DomTree, images: &[ImageSource], config: &ChunkerConfig) -> Vec<Chunk> {
    let thresholds = &config.thresholds;
    let mut claims = ClaimSet::default();

    let areas = areas::locate_content_areas(tree, thresholds);
    let area_drafts: Vec<ChunkDraft> = areas
        .iter()
        .flat_map(|&area| extract::extract_area(tree, area, thresholds, config.reading_order, &mut claims))
        .collect();

    let leftovers = assemble::sweep_remaining(tree, thresholds, &mut claims);

    let image_drafts = if config.images.include_in_chunks {
        image_chunks::image_drafts(tree, images)
    } else {
        Vec::new()
    };

    log::debug!(
        "Drafts: {} from {} areas, {} leftovers, {} images",
        area_drafts.len(),
        areas.len(),
        leftovers.len(),
        image_drafts.len()
    );

    let chunks = assemble::assemble(tree, area_drafts, leftovers, image_drafts, thresholds, config.reading_order);
    log::info!("Chunked page into {} chunks", chunks.len());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadingOrder;

    fn chunk_html(html: &str) -> Vec<Chunk> {
        let tree = DomTree::from_html(html).unwrap();
        chunk_document(&tree, &[], &ChunkerConfig::default())
    }

    #[test]
    fn test_claim_set_ranges() {
        let tree = DomTree::from_html("<body><div><p>a</p><p>b</p></div><p>c</p></body>").unwrap();
        let mut claims = ClaimSet::default();
        claims.claim(NodeId(2));

        assert!(claims.covers(&tree, NodeId(2)));
        assert!(!claims.covers(&tree, NodeId(3)));
        assert!(claims.has_claimed_descendant(&tree, NodeId(1)));
        assert!(!claims.has_claimed_descendant(&tree, NodeId(2)));
        assert!(!claims.has_claimed_descendant(&tree, NodeId(4)));
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_heading_and_paragraphs_form_one_chunk() {
        let chunks = chunk_html(
            "<body><h1>Title</h1><p>First paragraph with enough text.</p><p>Second paragraph with enough text.</p></body>",
        );

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_heading());
        assert_eq!(chunks[0].level, 1);
        assert!(chunks[0].text.starts_with("Title\n\nFirst paragraph"));
        assert!(chunks[0].text.ends_with("Second paragraph with enough text."));
    }

    #[test]
    fn test_navigation_excluded() {
        let chunks = chunk_html(
            "<body><nav><p>Home About Contact</p></nav>\
             <article><p>Lorem ipsum dolor sit amet, consectetur.</p></article></body>",
        );

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Lorem ipsum dolor sit amet, consectetur.");
    }

    #[test]
    fn test_image_chunk() {
        let tree = DomTree::from_html(r#"<body><img alt="Cat" src="https://x/cat.png" width="200" height="150"></body>"#)
            .unwrap();
        let chunks = chunk_document(&tree, &[ImageSource::new(NodeId(1), "https://x/cat.png")], &ChunkerConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Image);
        assert_eq!(chunks[0].text, "[Image: Cat] - https://x/cat.png");
    }

    #[test]
    fn test_images_can_be_excluded() {
        let tree = DomTree::from_html(r#"<body><img alt="Cat" src="/cat.png" width="200" height="150"></body>"#).unwrap();
        let mut config = ChunkerConfig::default();
        config.images.include_in_chunks = false;
        assert!(chunk_document(&tree, &[ImageSource::new(NodeId(1), "/cat.png")], &config).is_empty());
    }

    const ARTICLE: &str = "<body><header><p>Site wide banner text with many words in it</p></header>\
        <div class=\"extra\">This leading division sits outside of every detected content area.</div>\
        <main><h2>Chapter one</h2><p>The opening paragraph of chapter one.</p>\
        <p>The opening paragraph of chapter one.</p>\
        <h2>Chapter two</h2><div><p>Chapter two starts inside a wrapper.</p></div></main>\
        <footer><p>Copyright notice and other footer boilerplate words</p></footer></body>";

    #[test]
    fn test_pipeline_is_deterministic() {
        let first = chunk_html(ARTICLE);
        let second = chunk_html(ARTICLE);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_indices_contiguous_and_texts_unique() {
        let chunks = chunk_html(ARTICLE);
        let mut seen = std::collections::HashSet::new();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.id, Chunk::id_for(i));
            assert!(seen.insert(chunk.text.clone()));
        }
    }

    #[test]
    fn test_sections_and_leftovers_in_reading_order() {
        let chunks = chunk_html(ARTICLE);
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();

        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("This leading division"));
        assert!(texts[1].starts_with("Chapter one"));
        assert_eq!(texts[2], "Chapter two\n\nChapter two starts inside a wrapper.");
        assert!(texts.iter().all(|t| !t.contains("Copyright") && !t.contains("banner")));
    }

    #[test]
    fn test_depth_sort_option_runs() {
        let tree = DomTree::from_html(ARTICLE).unwrap();
        let config = ChunkerConfig {
            reading_order: ReadingOrder::DepthSort,
            ..ChunkerConfig::default()
        };
        let chunks = chunk_document(&tree, &[], &config);

        // Leftovers are appended after area chunks and fold into the last open section
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].text.ends_with("detected content area."));
    }

    #[test]
    fn test_empty_page_yields_no_chunks() {
        assert!(chunk_html("<body></body>").is_empty());
    }
}
