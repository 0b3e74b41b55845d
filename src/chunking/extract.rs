//! Per-area chunk extraction
//!
//! Walks the block-level descendants of one content area and groups body text
//! under the heading that precedes it. Blocks outside any open heading's section
//! become standalone chunks.

use crate::chunking::areas::inside_chunked_region;
use crate::chunking::chunk::{ChunkDraft, ChunkType};
use crate::chunking::classify::{char_count, has_significant_content, is_visible};
use crate::chunking::ClaimSet;
use crate::config::{ReadingOrder, Thresholds};
use crate::dom::{DomTree, NodeId};

/// Block-level tags that may carry a chunk of their own
pub const BLOCK_CANDIDATE_TAGS: &[&str] = &[
    "p", "li", "blockquote", "pre", "figcaption", "dd", "dt", "td", "th", "address", "div", "section", "article",
    "aside",
];

/// A heading-led group that is still accumulating body text
struct OpenGroup {
    draft: ChunkDraft,
    /// Section the heading governs: the heading's parent element
    scope: Option<NodeId>,
    members: Vec<NodeId>,
}

/// Extract provisional chunks from one content area
pub fn extract_area(
    tree: &DomTree,
    area: NodeId,
    thresholds: &Thresholds,
    order: ReadingOrder,
    claims: &mut ClaimSet,
) -> Vec<ChunkDraft> {
    let candidates = candidates(tree, area, thresholds, claims);
    let ordered = match order {
        ReadingOrder::Preorder => candidates,
        ReadingOrder::DepthSort => {
            let mut sorted = candidates;
            sorted.sort_by_key(|&id| tree.depth(id));
            sorted
        }
    };

    let mut drafts = Vec::new();
    let mut open: Option<OpenGroup> = None;

    for id in ordered {
        if claims.covers(tree, id) {
            continue;
        }

        let element = tree.element(id);
        let text = tree.text(id);

        if let Some(level) = element.heading_level() {
            flush(&mut open, &mut drafts, thresholds, claims);
            let mut draft = ChunkDraft::standalone(id, text, ChunkType::Heading);
            draft.level = level;
            open = Some(OpenGroup {
                draft,
                scope: tree.parent(id),
                members: vec![id],
            });
            continue;
        }

        let joins_open_group = open
            .as_ref()
            .is_some_and(|group| group.scope.is_some_and(|scope| tree.is_ancestor(scope, id)));

        if joins_open_group {
            if let Some(group) = open.as_mut() {
                group.draft.append_text(text);
                // Focus lands on the most recent contributing block
                group.draft.node = id;
                group.members.push(id);
            }
        } else {
            flush(&mut open, &mut drafts, thresholds, claims);
            drafts.push(ChunkDraft::standalone(id, text, ChunkType::Tag(element.tag_name.clone())));
            claims.claim(id);
        }
    }

    flush(&mut open, &mut drafts, thresholds, claims);
    log::debug!("Extracted {} drafts from area {:?}", drafts.len(), area);
    drafts
}

/// Admissible block candidates in document order, keeping only the innermost
/// non-heading blocks.
///
/// A wrapper that holds another candidate is dropped even when it also carries
/// loose text of its own. That text is not recovered by the leftover sweep either,
/// since the sweep skips elements that contain claimed nodes. Chunk elements never
/// nest, so replacing one chunk's text cannot overwrite another.
fn candidates(tree: &DomTree, area: NodeId, thresholds: &Thresholds, claims: &ClaimSet) -> Vec<NodeId> {
    let all: Vec<NodeId> = std::iter::once(area)
        .chain(tree.descendants(area))
        .filter(|&id| is_candidate(tree, id, thresholds))
        .filter(|&id| !claims.covers(tree, id))
        .collect();

    // In preorder the next candidate is a descendant iff it falls inside the subtree
    all.iter()
        .enumerate()
        .filter(|&(i, &id)| {
            tree.element(id).heading_level().is_some()
                || !all.get(i + 1).is_some_and(|next| next.0 < tree.subtree_end(id))
        })
        .map(|(_, &id)| id)
        .collect()
}

fn is_candidate(tree: &DomTree, id: NodeId, thresholds: &Thresholds) -> bool {
    let element = tree.element(id);
    if !is_visible(tree, id) || inside_chunked_region(tree, id) {
        return false;
    }

    if element.heading_level().is_some() {
        return char_count(tree.text(id)) > 0;
    }

    BLOCK_CANDIDATE_TAGS.iter().any(|tag| element.is_tag(tag))
        && has_significant_content(tree, id, thresholds.chunk_min_chars)
}

/// Emit the open group if its combined text is long enough
fn flush(open: &mut Option<OpenGroup>, drafts: &mut Vec<ChunkDraft>, thresholds: &Thresholds, claims: &mut ClaimSet) {
    let Some(group) = open.take() else {
        return;
    };

    if char_count(&group.draft.text) > thresholds.chunk_min_chars {
        for member in group.members {
            claims.claim(member);
        }
        drafts.push(group.draft);
    } else {
        log::debug!("Dropping short heading group at {:?}", group.draft.origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str, order: ReadingOrder) -> (DomTree, Vec<ChunkDraft>) {
        let tree = DomTree::from_html(html).unwrap();
        let mut claims = ClaimSet::default();
        let drafts = extract_area(&tree, tree.root(), &Thresholds::default(), order, &mut claims);
        (tree, drafts)
    }

    #[test]
    fn test_heading_groups_following_paragraphs() {
        let (tree, drafts) = extract(
            "<body><h1>Title</h1><p>The first paragraph is long enough.</p><p>The second paragraph is long too.</p></body>",
            ReadingOrder::Preorder,
        );

        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.chunk_type, ChunkType::Heading);
        assert_eq!(draft.level, 1);
        assert_eq!(
            draft.text,
            "Title\n\nThe first paragraph is long enough.\n\nThe second paragraph is long too."
        );
        assert!(tree.element(draft.origin).is_tag("h1"));
        // Anchor advanced to the last paragraph
        assert_eq!(draft.node, NodeId(3));
    }

    #[test]
    fn test_blocks_outside_heading_section_stand_alone() {
        let (tree, drafts) = extract(
            "<body><section><h2>Intro</h2><p>Paragraph inside the intro section.</p></section>\
             <div><p>A paragraph in a separate container.</p></div></body>",
            ReadingOrder::Preorder,
        );

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].chunk_type, ChunkType::Heading);
        assert_eq!(drafts[1].chunk_type, ChunkType::Tag("p".to_string()));
        assert!(tree.element(drafts[1].node).is_tag("p"));
    }

    #[test]
    fn test_short_heading_group_dropped() {
        let (_, drafts) = extract("<body><h2>Lonely</h2></body>", ReadingOrder::Preorder);
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_wrapper_loose_text_yields_to_inner_block() {
        let (tree, drafts) = extract(
            "<body><div>Loose wrapper text that is long enough on its own.\
             <p>The inner paragraph carries the chunk.</p></div></body>",
            ReadingOrder::Preorder,
        );

        assert_eq!(drafts.len(), 1);
        assert!(tree.element(drafts[0].node).is_tag("p"));
        assert_eq!(drafts[0].text, "The inner paragraph carries the chunk.");
    }

    #[test]
    fn test_innermost_blocks_preferred() {
        let (tree, drafts) = extract(
            "<body><div><p>Outer container paragraph one here.</p><p>Outer container paragraph two here.</p></div></body>",
            ReadingOrder::Preorder,
        );

        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| tree.element(d.node).is_tag("p")));
    }

    #[test]
    fn test_short_and_inline_elements_ignored() {
        let (_, drafts) = extract(
            "<body><p>tiny</p><span>An inline span with plenty of text in it</span></body>",
            ReadingOrder::Preorder,
        );
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_claimed_nodes_skipped() {
        let tree = DomTree::from_html("<body><p>A paragraph that is already claimed.</p></body>").unwrap();
        let mut claims = ClaimSet::default();
        claims.claim(NodeId(1));
        let drafts = extract_area(&tree, tree.root(), &Thresholds::default(), ReadingOrder::Preorder, &mut claims);
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_depth_sort_reorders_asymmetric_nesting() {
        let html = "<body><div><div><p>Deeply nested paragraph comes first.</p></div></div>\
                    <p>Shallow paragraph comes second here.</p></body>";

        let (_, preorder) = extract(html, ReadingOrder::Preorder);
        assert!(preorder[0].text.starts_with("Deeply"));

        let (_, depth_sorted) = extract(html, ReadingOrder::DepthSort);
        assert!(depth_sorted[0].text.starts_with("Shallow"));
        assert_eq!(depth_sorted.len(), 2);
    }

    #[test]
    fn test_extracted_nodes_are_claimed() {
        let tree = DomTree::from_html("<body><p>This paragraph will be claimed now.</p></body>").unwrap();
        let mut claims = ClaimSet::default();
        extract_area(&tree, tree.root(), &Thresholds::default(), ReadingOrder::Preorder, &mut claims);
        assert!(claims.is_claimed(NodeId(1)));
    }
}
