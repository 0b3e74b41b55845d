//! Final chunk assembly
//!
//! Combines per-area drafts with the leftover sweep and image drafts, folds
//! continuation drafts into major-heading groups, then filters and indexes the
//! result. The order produced here is the reading order of the page.

use crate::chunking::areas::inside_chunked_region;
use crate::chunking::chunk::{Chunk, ChunkDraft, ChunkType};
use crate::chunking::classify::{char_count, is_navigation_like, is_visible, word_count};
use crate::chunking::ClaimSet;
use crate::config::{ReadingOrder, Thresholds};
use crate::dom::{DomTree, NodeId};
use std::collections::HashSet;

/// Tags admitted by the leftover-content sweep
pub const REMAINING_TAGS: &[&str] = &["p", "div", "span", "article", "section", "aside"];

/// Sweep the whole document for substantial content no area produced
pub fn sweep_remaining(tree: &DomTree, thresholds: &Thresholds, claims: &mut ClaimSet) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();

    for id in tree.descendants(tree.root()) {
        let element = tree.element(id);
        if !REMAINING_TAGS.iter().any(|tag| element.is_tag(tag)) {
            continue;
        }

        if claims.covers(tree, id) || claims.has_claimed_descendant(tree, id) {
            continue;
        }

        if !is_visible(tree, id) || inside_chunked_region(tree, id) {
            continue;
        }

        let text = tree.text(id);
        if char_count(text) < thresholds.remaining_min_chars || word_count(text) < thresholds.remaining_min_words {
            continue;
        }

        let chunk_type = if element.is_tag("div") {
            ChunkType::ContentDiv
        } else {
            ChunkType::Tag(element.tag_name.clone())
        };
        drafts.push(ChunkDraft::standalone(id, text, chunk_type));
        claims.claim(id);
    }

    log::debug!("Remaining-content sweep admitted {} drafts", drafts.len());
    drafts
}

/// Combine, group and finalize drafts into indexed chunks
pub fn assemble(
    tree: &DomTree,
    areas: Vec<ChunkDraft>,
    leftovers: Vec<ChunkDraft>,
    images: Vec<ChunkDraft>,
    thresholds: &Thresholds,
    order: ReadingOrder,
) -> Vec<Chunk> {
    // Noise drafts are removed before grouping so their text never leaks into a section
    let mut combined: Vec<ChunkDraft> = areas
        .into_iter()
        .chain(leftovers)
        .chain(images)
        .filter(|draft| anchor_is_content(tree, draft.node))
        .collect();
    if order == ReadingOrder::Preorder {
        combined.sort_by_key(|draft| draft.origin);
    }

    let grouped = group_sections(combined, thresholds.group_heading_max_level);
    finalize(tree, grouped, thresholds)
}

/// Fold continuation drafts into the preceding major heading's group
pub fn group_sections(drafts: Vec<ChunkDraft>, max_level: u8) -> Vec<ChunkDraft> {
    let mut out = Vec::with_capacity(drafts.len());
    let mut open: Option<ChunkDraft> = None;

    for draft in drafts {
        if draft.is_heading() && draft.level <= max_level {
            out.extend(open.take());
            open = Some(draft);
        } else if draft.is_image() {
            out.extend(open.take());
            out.push(draft);
        } else if let Some(group) = open.as_mut() {
            group.append_text(&draft.text);
        } else {
            out.push(draft);
        }
    }

    out.extend(open);
    out
}

/// Drop noise and duplicates, then assign ids and indices
fn finalize(tree: &DomTree, drafts: Vec<ChunkDraft>, thresholds: &Thresholds) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    let mut chunks = Vec::new();

    for draft in drafts {
        let text = draft.text.trim();
        if char_count(text) < thresholds.final_min_chars {
            continue;
        }

        if !anchor_is_content(tree, draft.node) {
            continue;
        }

        if !seen.insert(text.to_string()) {
            log::debug!("Dropping duplicate chunk text at {:?}", draft.node);
            continue;
        }

        let index = chunks.len();
        chunks.push(Chunk {
            id: Chunk::id_for(index),
            node: Some(draft.node),
            text: text.to_string(),
            chunk_type: draft.chunk_type,
            level: draft.level,
            index,
        });
    }

    chunks
}

fn anchor_is_content(tree: &DomTree, node: NodeId) -> bool {
    tree.contains(node) && is_visible(tree, node) && !is_navigation_like(tree, node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(node: usize, text: &str, chunk_type: ChunkType, level: u8) -> ChunkDraft {
        let mut draft = ChunkDraft::standalone(NodeId(node), text, chunk_type);
        draft.level = level;
        draft
    }

    fn p(node: usize, text: &str) -> ChunkDraft {
        draft(node, text, ChunkType::Tag("p".to_string()), 0)
    }

    #[test]
    fn test_group_sections() {
        let grouped = group_sections(
            vec![
                p(1, "Before any heading"),
                draft(2, "Major", ChunkType::Heading, 2),
                p(3, "Body one"),
                draft(4, "Minor", ChunkType::Heading, 4),
                draft(5, "[Image: x] - y", ChunkType::Image, 0),
                p(6, "After image"),
            ],
            3,
        );

        let texts: Vec<_> = grouped.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Before any heading", "Major\n\nBody one\n\nMinor", "[Image: x] - y", "After image"]
        );
    }

    #[test]
    fn test_finalize_filters_and_indexes() {
        let tree = DomTree::from_html(
            "<body><p>Keep this one</p><p>Keep this one</p><p>tiny</p>\
             <nav><p>Navigation text here</p></nav><p hidden>Hidden paragraph</p><p>Second keeper</p></body>",
        )
        .unwrap();

        let drafts = vec![
            p(1, "Keep this one"),
            p(2, " Keep this one "),
            p(3, "tiny"),
            p(5, "Navigation text here"),
            p(6, "Hidden paragraph"),
            p(7, "Second keeper"),
        ];
        let chunks = finalize(&tree, drafts, &Thresholds::default());

        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Keep this one", "Second keeper"]);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.id, format!("chunk-{}", i));
        }
        assert_eq!(chunks[1].node, Some(NodeId(7)));
    }

    #[test]
    fn test_sweep_remaining() {
        let tree = DomTree::from_html(
            "<body><div>This leftover division has more than fifty characters of words.</div>\
             <span>Supercalifragilisticexpialidocious antidisestablishmentarianism</span>\
             <p>This paragraph is claimed already and is long enough to be admitted.</p></body>",
        )
        .unwrap();
        let mut claims = ClaimSet::default();
        claims.claim(NodeId(3));

        let drafts = sweep_remaining(&tree, &Thresholds::default(), &mut claims);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].chunk_type, ChunkType::ContentDiv);
        assert!(claims.is_claimed(NodeId(1)));
    }

    #[test]
    fn test_sweep_skips_containers_of_claimed_nodes() {
        let tree = DomTree::from_html(
            "<body><section><p>Claimed paragraph that is long enough on its own.</p>\
             <p>Another sentence to push the section past the sweep threshold.</p></section></body>",
        )
        .unwrap();
        let mut claims = ClaimSet::default();
        claims.claim(NodeId(2));

        let drafts = sweep_remaining(&tree, &Thresholds::default(), &mut claims);
        let tags: Vec<_> = drafts.iter().map(|d| tree.element(d.node).tag_name.as_str()).collect();
        assert_eq!(tags, vec!["p"]);
        assert_eq!(drafts[0].node, NodeId(3));
    }

    #[test]
    fn test_assemble_orders_by_origin_in_preorder() {
        let tree = DomTree::from_html(
            "<body><img alt=\"Lead\" src=\"/lead.png\" width=\"200\" height=\"100\"><p>Paragraph after the image</p></body>",
        )
        .unwrap();

        let chunks = assemble(
            &tree,
            vec![p(2, "Paragraph after the image")],
            Vec::new(),
            vec![draft(1, "[Image: Lead] - /lead.png", ChunkType::Image, 0)],
            &Thresholds::default(),
            ReadingOrder::Preorder,
        );
        assert!(chunks[0].is_image());

        let chunks = assemble(
            &tree,
            vec![p(2, "Paragraph after the image")],
            Vec::new(),
            vec![draft(1, "[Image: Lead] - /lead.png", ChunkType::Image, 0)],
            &Thresholds::default(),
            ReadingOrder::DepthSort,
        );
        assert!(chunks[1].is_image());
    }
}
