use crate::dom::element::{DomNode, ElementNode};
use crate::dom::selector_map::{ElementSelector, SelectorMap};
use crate::error::{ChunkError, Result};
use headless_chrome::Tab;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Handle to an element of a [`DomTree`]; the value is the element's preorder position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Size of the page viewport when the snapshot was taken
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280.0, height: 800.0 }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    /// The element itself; its `children` are moved into the arena
    element: ElementNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
    /// One past the last descendant
    end: usize,
    /// Rendered text, approximating `innerText`
    text: String,
}

/// Shape returned by the extraction script: a flat preorder record list,
/// so parsing depth stays constant however deep the page nests
#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    viewport: Viewport,
    nodes: Vec<serde_json::Value>,
}

/// One snapshot record; `parent` indexes an earlier element record
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotRecord {
    Text {
        parent: usize,
        text: String,
    },
    Element {
        parent: Option<usize>,
        #[serde(flatten)]
        element: ElementNode,
    },
}

enum PendingChild {
    Text(String),
    Element(usize),
}

/// Immutable snapshot of a page's DOM, stored as a preorder arena
#[derive(Debug, Clone)]
pub struct DomTree {
    slots: Vec<Slot>,

    /// Viewport at capture time
    pub viewport: Viewport,

    /// Structural selectors for every element
    pub selector_map: SelectorMap,
}

impl DomTree {
    /// Build a tree from a root element with a default viewport
    pub fn new(root: ElementNode) -> Self {
        Self::with_viewport(root, Viewport::default())
    }

    /// Build a tree from a root element
    pub fn with_viewport(root: ElementNode, viewport: Viewport) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            viewport,
            selector_map: SelectorMap::new(),
        };
        let path = css_ident(&root.tag_name);
        tree.insert(root, None, 0, &path, false);
        tree
    }

    /// Build DOM tree from a browser tab
    pub fn from_tab(tab: &Arc<Tab>) -> Result<Self> {
        let js_code = include_str!("extract_dom.js");

        let result = tab
            .evaluate(js_code, false)
            .map_err(|e| ChunkError::DomParseFailed(format!("Failed to execute DOM extraction script: {}", e)))?;

        let json_value = result
            .value
            .ok_or_else(|| ChunkError::DomParseFailed("No value returned from DOM extraction".to_string()))?;

        // The script returns a JSON string to avoid CDP object-depth limits
        let json_str: String = serde_json::from_value(json_value)
            .map_err(|e| ChunkError::DomParseFailed(format!("Failed to get JSON string: {}", e)))?;

        Self::from_snapshot_json(&json_str)
    }

    /// Parse the extraction script's JSON output.
    ///
    /// Malformed records are skipped along with everything below them; only a
    /// missing or malformed root element fails the parse.
    pub fn from_snapshot_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| ChunkError::DomParseFailed(format!("Failed to parse DOM JSON: {}", e)))?;
        let root = rebuild(snapshot.nodes)?;
        Ok(Self::with_viewport(root, snapshot.viewport))
    }

    /// Recursively move `node` into the arena, returning its id and rendered text
    fn insert(
        &mut self,
        mut node: ElementNode,
        parent: Option<NodeId>,
        depth: usize,
        css_path: &str,
        ancestor_hidden: bool,
    ) -> (NodeId, String) {
        let id = NodeId(self.slots.len());
        let children = std::mem::take(&mut node.children);
        let hidden = ancestor_hidden || node.style.is_display_none();

        // Descendants of `display: none` have no offsetParent
        if ancestor_hidden {
            node.has_offset_parent = false;
        }

        self.selector_map.register(id, ElementSelector::new(css_path, &node.tag_name));

        let renders_text = !hidden && !node.style.is_visibility_hidden() && !node.is_non_rendered_tag();
        self.slots.push(Slot {
            element: node,
            parent,
            children: Vec::new(),
            depth,
            end: 0,
            text: String::new(),
        });

        let mut raw = String::new();
        let mut position = 0;
        for child in children {
            match child {
                DomNode::Text(text) => {
                    if renders_text {
                        push_inline(&mut raw, &text);
                    }
                }
                DomNode::Element(element) => {
                    position += 1;
                    let is_break = element.is_tag("br");
                    let is_block = element.is_block();
                    let child_path = format!("{} > {}:nth-child({})", css_path, css_ident(&element.tag_name), position);
                    let (child_id, child_text) = self.insert(element, Some(id), depth + 1, &child_path, hidden);
                    self.slots[id.0].children.push(child_id);

                    if !renders_text {
                        continue;
                    }
                    if is_break {
                        raw.push('\n');
                    } else if is_block {
                        raw.push('\n');
                        raw.push_str(&child_text);
                        raw.push('\n');
                    } else {
                        raw.push_str(&child_text);
                    }
                }
            }
        }

        let text = normalize_text(&raw);
        let end = self.slots.len();
        let slot = &mut self.slots[id.0];
        slot.end = end;
        slot.text = text.clone();
        (id, text)
    }

    /// The root element (normally `body`)
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Count total elements in the tree
    pub fn count_elements(&self) -> usize {
        self.slots.len()
    }

    /// All element ids in document order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.slots.len()).map(NodeId)
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    /// Check whether an id belongs to this tree
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.slots.len()
    }

    /// The element for an id issued by this tree
    pub fn element(&self, id: NodeId) -> &ElementNode {
        &self.slot(id).element
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    /// Element children in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.slot(id).depth
    }

    /// Rendered text of the element, whitespace-normalized and trimmed
    pub fn text(&self, id: NodeId) -> &str {
        &self.slot(id).text
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// The element itself followed by its ancestors
    pub fn ancestors_or_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(id).chain(self.ancestors(id))
    }

    /// Strict descendants in document order
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let end = self.slot(id).end;
        (id.0 + 1..end).map(NodeId)
    }

    /// One past the last descendant's position
    pub fn subtree_end(&self, id: NodeId) -> usize {
        self.slot(id).end
    }

    /// Whether `ancestor` strictly contains `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor.0 < node.0 && node.0 < self.slot(ancestor).end
    }

    /// All elements with the given tag, in document order
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes().filter(move |&id| self.element(id).is_tag(tag))
    }

    /// Get element selector by node
    pub fn get_selector(&self, id: NodeId) -> Option<&ElementSelector> {
        self.selector_map.get(id)
    }

    /// Resolve a structural CSS path captured from an earlier snapshot
    pub fn find_by_selector(&self, css_selector: &str) -> Option<NodeId> {
        self.selector_map.find_by_css_selector(css_selector)
    }
}

/// Reassemble the nested root element from flat preorder records
fn rebuild(records: Vec<serde_json::Value>) -> Result<ElementNode> {
    let mut elements: Vec<Option<ElementNode>> = Vec::with_capacity(records.len());
    let mut content: Vec<Vec<PendingChild>> = Vec::with_capacity(records.len());

    for (index, value) in records.into_iter().enumerate() {
        let record = match serde_json::from_value::<SnapshotRecord>(value) {
            Ok(record) => Some(record),
            Err(e) if index == 0 => {
                return Err(ChunkError::DomParseFailed(format!("Malformed root element: {}", e)));
            }
            Err(e) => {
                log::warn!("Skipping malformed snapshot record {}: {}", index, e);
                None
            }
        };

        // Children always follow their parent, so a live parent is an earlier element
        let live_parent = |parent: usize| parent < index && elements[parent].is_some();
        let mut element = None;
        match record {
            Some(SnapshotRecord::Text { parent, text }) if live_parent(parent) => {
                content[parent].push(PendingChild::Text(text));
            }
            Some(SnapshotRecord::Element { parent: None, element: root }) if index == 0 => {
                element = Some(root);
            }
            Some(SnapshotRecord::Element {
                parent: Some(parent),
                element: child,
            }) if live_parent(parent) => {
                content[parent].push(PendingChild::Element(index));
                element = Some(child);
            }
            Some(_) => log::warn!("Skipping snapshot record {} with no live parent", index),
            None => {}
        }

        elements.push(element);
        content.push(Vec::new());
    }

    // Every child sits after its parent, so walking backwards completes children first
    for index in (0..elements.len()).rev() {
        let pending = std::mem::take(&mut content[index]);
        if pending.is_empty() {
            continue;
        }

        let mut children = Vec::with_capacity(pending.len());
        for child in pending {
            match child {
                PendingChild::Text(text) => children.push(DomNode::Text(text)),
                PendingChild::Element(child) => {
                    if let Some(element) = elements[child].take() {
                        children.push(DomNode::Element(element));
                    }
                }
            }
        }

        if let Some(element) = elements[index].as_mut() {
            element.children = children;
        }
    }

    elements
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(|| ChunkError::DomParseFailed("Snapshot has no root element".to_string()))
}

/// Escape a tag name for use as a CSS type selector (`o:p` becomes `o\:p`)
fn css_ident(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for c in tag.chars() {
        if !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Append a text run, folding every whitespace character to a space
fn push_inline(out: &mut String, text: &str) {
    out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
}

/// Collapse whitespace within lines and drop empty lines
pub(crate) fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> ElementNode {
        let header = ElementNode::new("header")
            .with_child(ElementNode::new("button").with_attribute("id", "nav-btn").with_text("Menu"));

        let main = ElementNode::new("main")
            .with_child(ElementNode::new("h1").with_text("Title"))
            .with_child(
                ElementNode::new("p")
                    .with_text("Some ")
                    .with_child(ElementNode::new("b").with_text("bold"))
                    .with_text(" text"),
            )
            .with_child(ElementNode::new("div").with_display("none").with_child(ElementNode::new("p").with_text("Hidden")));

        ElementNode::new("body").with_child(header).with_child(main)
    }

    #[test]
    fn test_dom_tree_creation() {
        let tree = DomTree::new(create_test_tree());

        assert_eq!(tree.element(tree.root()).tag_name, "body");
        assert_eq!(tree.children(tree.root()).len(), 2);
        assert_eq!(tree.count_elements(), 9);
    }

    #[test]
    fn test_preorder_ids_and_links() {
        let tree = DomTree::new(create_test_tree());
        let tags: Vec<_> = tree.nodes().map(|id| tree.element(id).tag_name.clone()).collect();
        assert_eq!(tags, vec!["body", "header", "button", "main", "h1", "p", "b", "div", "p"]);

        let bold = NodeId(6);
        assert_eq!(tree.parent(bold), Some(NodeId(5)));
        assert_eq!(tree.depth(bold), 3);
        assert_eq!(tree.ancestors(bold).collect::<Vec<_>>(), vec![NodeId(5), NodeId(3), NodeId(0)]);
        assert!(tree.is_ancestor(NodeId(3), bold));
        assert!(!tree.is_ancestor(NodeId(1), bold));
        assert_eq!(tree.descendants(NodeId(3)).count(), 5);
    }

    #[test]
    fn test_rendered_text() {
        let tree = DomTree::new(create_test_tree());

        assert_eq!(tree.text(NodeId(5)), "Some bold text");
        assert_eq!(tree.text(NodeId(3)), "Title\nSome bold text");
        assert_eq!(tree.text(NodeId(7)), "");
        assert_eq!(tree.text(tree.root()), "Menu\nTitle\nSome bold text");
    }

    #[test]
    fn test_hidden_ancestor_clears_offset_parent() {
        let tree = DomTree::new(create_test_tree());
        assert!(tree.element(NodeId(7)).has_offset_parent);
        assert!(!tree.element(NodeId(8)).has_offset_parent);
    }

    #[test]
    fn test_selector_paths() {
        let tree = DomTree::new(create_test_tree());

        assert_eq!(tree.get_selector(NodeId(0)).unwrap().css_selector, "body");
        assert_eq!(
            tree.get_selector(NodeId(5)).unwrap().css_selector,
            "body > main:nth-child(2) > p:nth-child(2)"
        );
        assert_eq!(tree.find_by_selector("body > main:nth-child(2) > h1:nth-child(1)"), Some(NodeId(4)));
    }

    #[test]
    fn test_from_snapshot_json() {
        let json = r#"{
            "viewport": {"width": 1024, "height": 768},
            "nodes": [
                {"parent": null, "tag_name": "body"},
                {"parent": 0, "text": "Intro "},
                {"parent": 0, "tag_name": "p", "style": {"display": "block", "visibility": "visible"}},
                {"parent": 2, "text": "First paragraph"},
                {"parent": 0, "text": " outro"}
            ]
        }"#;
        let tree = DomTree::from_snapshot_json(json).unwrap();

        assert_eq!(tree.viewport.height, 768.0);
        assert_eq!(tree.count_elements(), 2);
        assert_eq!(tree.text(NodeId(1)), "First paragraph");
        assert_eq!(tree.text(tree.root()), "Intro\nFirst paragraph\noutro");
    }

    /// Snapshot of `depth` nested divs with a paragraph at the bottom
    fn nested_snapshot(depth: usize) -> String {
        let mut nodes = vec![serde_json::json!({"parent": null, "tag_name": "body"})];
        for level in 0..depth {
            nodes.push(serde_json::json!({"parent": level, "tag_name": "div"}));
        }
        nodes.push(serde_json::json!({"parent": depth, "tag_name": "p"}));
        nodes.push(serde_json::json!({"parent": depth + 1, "text": "Deeply nested words"}));
        serde_json::json!({"nodes": nodes}).to_string()
    }

    #[test]
    fn test_deeply_nested_snapshot_parses() {
        for depth in [40, 64, 100, 300] {
            let tree = DomTree::from_snapshot_json(&nested_snapshot(depth)).unwrap();
            let paragraph = NodeId(depth + 1);

            assert_eq!(tree.count_elements(), depth + 2);
            assert_eq!(tree.depth(paragraph), depth + 1);
            assert_eq!(tree.text(paragraph), "Deeply nested words");
            assert_eq!(tree.text(tree.root()), "Deeply nested words");
        }
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let json = r#"{"nodes": [
            {"parent": null, "tag_name": "body"},
            {"parent": 0, "tag_name": 42},
            {"parent": 1, "tag_name": "p"},
            {"parent": 7, "text": "orphan"},
            {"parent": 0, "tag_name": "p"},
            {"parent": 4, "text": "Survivor"}
        ]}"#;
        let tree = DomTree::from_snapshot_json(json).unwrap();

        assert_eq!(tree.count_elements(), 2);
        assert_eq!(tree.text(tree.root()), "Survivor");
    }

    #[test]
    fn test_snapshot_without_root_fails() {
        let err = DomTree::from_snapshot_json(r#"{"nodes": [{"parent": 0, "text": "x"}]}"#).unwrap_err();
        assert!(matches!(err, ChunkError::DomParseFailed(_)));

        let err = DomTree::from_snapshot_json(r#"{"nodes": []}"#).unwrap_err();
        assert!(matches!(err, ChunkError::DomParseFailed(_)));
    }

    #[test]
    fn test_prefixed_tags_are_escaped_in_paths() {
        let body = ElementNode::new("body")
            .with_child(ElementNode::new("p"))
            .with_child(ElementNode::new("o:p").with_text("Office paragraph"));
        let tree = DomTree::new(body);

        assert_eq!(tree.get_selector(NodeId(2)).unwrap().css_selector, "body > o\\:p:nth-child(2)");
        assert_eq!(tree.find_by_selector("body > o\\:p:nth-child(2)"), Some(NodeId(2)));
    }

    #[test]
    fn test_from_snapshot_json_rejects_garbage() {
        let err = DomTree::from_snapshot_json("{\"nope\": 1}").unwrap_err();
        assert!(matches!(err, ChunkError::DomParseFailed(_)));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a   b \n\n  c\t d  "), "a b\nc d");
        assert_eq!(normalize_text("   "), "");
    }
}
