//! Content-area location
//!
//! Finds the containers most likely to hold the page's primary content, then
//! reduces them to a set where no area contains another.

use crate::chunking::classify::{char_count, has_significant_content, is_visible};
use crate::config::Thresholds;
use crate::dom::{DomTree, ElementNode, NodeId};

/// Semantic container tags
pub const SEMANTIC_TAGS: &[&str] = &["main", "article", "section", "aside"];

/// ARIA roles of content containers
pub const SEMANTIC_ROLES: &[&str] = &["main", "article", "region", "document"];

/// Class/id fragments that usually name a content container
pub const CONTENT_NAME_PATTERNS: &[&str] = &["content", "post", "article", "body", "description", "summary", "excerpt"];

/// Attribute written on every element that carries a chunk
pub const CHUNK_ID_ATTRIBUTE: &str = "data-chunk-id";

/// Locate the primary content areas of a page, in document order
pub fn locate_content_areas(tree: &DomTree, thresholds: &Thresholds) -> Vec<NodeId> {
    let mut candidates: Vec<NodeId> = tree
        .descendants(tree.root())
        .filter(|&id| is_named_container(tree.element(id)))
        .filter(|&id| admissible(tree, id, thresholds))
        .collect();

    let dense = tree
        .descendants(tree.root())
        .filter(|&id| tree.element(id).is_tag("div"))
        .filter(|&id| is_dense_div(tree, id, thresholds))
        .filter(|id| !candidates.contains(id))
        .collect::<Vec<_>>();
    candidates.extend(dense);
    log::debug!("Content area candidates: {}", candidates.len());

    if candidates.is_empty() {
        log::debug!("No content areas found, falling back to the document body");
        return vec![tree.root()];
    }

    let areas = most_specific(tree, candidates);
    log::debug!("Content areas after de-overlap: {}", areas.len());
    areas
}

fn is_named_container(element: &ElementNode) -> bool {
    if SEMANTIC_TAGS.iter().any(|tag| element.is_tag(tag)) {
        return true;
    }

    if element
        .role()
        .is_some_and(|role| SEMANTIC_ROLES.iter().any(|r| role.eq_ignore_ascii_case(r)))
    {
        return true;
    }

    element.classes().chain(element.id().map(String::as_str)).any(|name| {
        let name = name.to_ascii_lowercase();
        CONTENT_NAME_PATTERNS.iter().any(|pattern| name.contains(pattern))
    })
}

fn admissible(tree: &DomTree, id: NodeId, thresholds: &Thresholds) -> bool {
    is_visible(tree, id)
        && has_significant_content(tree, id, thresholds.area_min_chars)
        && !inside_chunked_region(tree, id)
}

/// A text-dense `div` with few enough children to not be a layout shell
fn is_dense_div(tree: &DomTree, id: NodeId, thresholds: &Thresholds) -> bool {
    admissible(tree, id, thresholds)
        && tree.children(id).len() < thresholds.density_max_children
        && char_count(tree.text(id)) > thresholds.density_min_chars
}

/// Whether the element sits in a region marked by an earlier chunking pass
pub fn inside_chunked_region(tree: &DomTree, id: NodeId) -> bool {
    tree.ancestors_or_self(id)
        .any(|node| tree.element(node).get_attribute(CHUNK_ID_ATTRIBUTE).is_some())
}

/// Replace every candidate that contains another candidate by the contained ones
fn most_specific(tree: &DomTree, mut candidates: Vec<NodeId>) -> Vec<NodeId> {
    candidates.sort();
    candidates.dedup();
    candidates
        .iter()
        .copied()
        .filter(|&outer| !candidates.iter().any(|&inner| tree.is_ancestor(outer, inner)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "This paragraph carries more than enough characters to count as real reading material, \
                        which is what the text-density sweep looks for in plain div markup.";

    fn areas_of(html: &str) -> (DomTree, Vec<String>) {
        let tree = DomTree::from_html(html).unwrap();
        let areas = locate_content_areas(&tree, &Thresholds::default());
        let tags = areas.iter().map(|&id| tree.element(id).tag_name.clone()).collect();
        (tree, tags)
    }

    #[test]
    fn test_semantic_areas() {
        let (_, tags) = areas_of("<body><main><p>Main body text here</p></main><aside><p>Related links</p></aside></body>");
        assert_eq!(tags, vec!["main", "aside"]);
    }

    #[test]
    fn test_nested_candidates_resolve_to_innermost() {
        let (tree, tags) = areas_of("<body><main><article><p>Story text goes here</p></article></main></body>");
        assert_eq!(tags, vec!["article"]);
        assert!(tree.element(NodeId(2)).is_tag("article"));
    }

    #[test]
    fn test_class_name_patterns() {
        let (_, tags) = areas_of(r#"<body><div class="Post-Body"><span>Some text for the post</span></div></body>"#);
        assert_eq!(tags, vec!["div"]);
    }

    #[test]
    fn test_density_sweep() {
        let html = format!("<body><div><div><p>{LONG}</p></div></div></body>");
        let (tree, tags) = areas_of(&html);
        assert_eq!(tags, vec!["div"]);
        // The inner div wins over its ancestor
        let areas = locate_content_areas(&tree, &Thresholds::default());
        assert_eq!(areas, vec![NodeId(2)]);
    }

    #[test]
    fn test_density_sweep_skips_layout_shells() {
        let items: String = (0..20).map(|i| format!("<span>item number {i} </span>")).collect();
        let html = format!("<body><div>{items}</div></body>");
        let (tree, _) = areas_of(&html);
        assert_eq!(locate_content_areas(&tree, &Thresholds::default()), vec![tree.root()]);
    }

    #[test]
    fn test_hidden_and_short_candidates_rejected() {
        let (tree, _) = areas_of(r#"<body><main hidden><p>Invisible main text</p></main><article><p>short</p></article></body>"#);
        assert_eq!(locate_content_areas(&tree, &Thresholds::default()), vec![tree.root()]);
    }

    #[test]
    fn test_previously_chunked_regions_skipped() {
        let (tree, _) = areas_of(r#"<body><article data-chunk-id="chunk-0"><p>Already chunked text</p></article></body>"#);
        assert_eq!(locate_content_areas(&tree, &Thresholds::default()), vec![tree.root()]);
    }

    #[test]
    fn test_empty_page_falls_back_to_body() {
        let (tree, tags) = areas_of("<body></body>");
        assert_eq!(tags, vec!["body"]);
        assert_eq!(tree.count_elements(), 1);
    }
}
