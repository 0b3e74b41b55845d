use crate::dom::tree::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Information needed to locate an element in the live page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementSelector {
    /// Structural CSS path from `body`, e.g. `body > main:nth-child(2) > p:nth-child(1)`
    pub css_selector: String,

    /// Element's tag name
    pub tag_name: String,
}

impl ElementSelector {
    pub fn new(css_selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            css_selector: css_selector.into(),
            tag_name: tag_name.into(),
        }
    }
}

/// Map of snapshot nodes to their selectors
/// Uses IndexMap to preserve document order
#[derive(Debug, Clone, Default)]
pub struct SelectorMap {
    map: IndexMap<NodeId, ElementSelector>,
}

impl SelectorMap {
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Register the selector of a node
    pub fn register(&mut self, node: NodeId, selector: ElementSelector) {
        self.map.insert(node, selector);
    }

    pub fn get(&self, node: NodeId) -> Option<&ElementSelector> {
        self.map.get(&node)
    }

    /// Find node by CSS selector
    pub fn find_by_css_selector(&self, css_selector: &str) -> Option<NodeId> {
        self.map
            .iter()
            .find(|(_, sel)| sel.css_selector == css_selector)
            .map(|(node, _)| *node)
    }
}
