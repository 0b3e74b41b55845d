//! Stateless predicates over snapshot elements

use crate::dom::{DomTree, ElementNode, NodeId};

/// Structural tags that mark navigation or page chrome
pub const NAVIGATION_TAGS: &[&str] = &["nav", "menu", "header", "footer"];

/// ARIA landmark roles that mark navigation or page chrome
pub const NAVIGATION_ROLES: &[&str] = &["navigation", "banner", "contentinfo"];

/// Class/id segments that mark navigation, sidebars and ads
pub const NAVIGATION_NAME_TOKENS: &[&str] = &[
    "nav", "navbar", "navigation", "menu", "header", "footer", "sidebar", "ad", "ads", "advert", "advertisement",
];

/// Whether the element is rendered with a non-empty box
pub fn is_visible(tree: &DomTree, id: NodeId) -> bool {
    let element = tree.element(id);
    !element.style.is_display_none()
        && !element.style.is_visibility_hidden()
        && element.has_offset_parent
        && element.bounding_box.is_none_or(|bbox| bbox.is_visible())
}

/// Whether the element's trimmed text has at least `min_chars` characters
pub fn has_significant_content(tree: &DomTree, id: NodeId, min_chars: usize) -> bool {
    char_count(tree.text(id)) >= min_chars
}

pub fn char_count(text: &str) -> usize {
    text.trim().chars().count()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn is_heading(element: &ElementNode) -> bool {
    element.heading_level().is_some()
}

/// Whether the element or any ancestor looks like navigation or boilerplate
pub fn is_navigation_like(tree: &DomTree, id: NodeId) -> bool {
    tree.ancestors_or_self(id).any(|node| matches_navigation(tree.element(node)))
}

fn matches_navigation(element: &ElementNode) -> bool {
    if NAVIGATION_TAGS.iter().any(|tag| element.is_tag(tag)) {
        return true;
    }

    if element
        .role()
        .is_some_and(|role| NAVIGATION_ROLES.iter().any(|r| role.eq_ignore_ascii_case(r)))
    {
        return true;
    }

    element.classes().any(has_navigation_segment)
        || element.id().is_some_and(|id| has_navigation_segment(id))
}

/// Match whole `-`/`_`-separated segments so that e.g. `site-header` matches but `shadow` does not
fn has_navigation_segment(name: &str) -> bool {
    name.split(['-', '_'])
        .any(|segment| NAVIGATION_NAME_TOKENS.iter().any(|token| segment.eq_ignore_ascii_case(token)))
}
