use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A child of an element: either a text run or another element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DomNode {
    Text(String),
    Element(ElementNode),
}

/// Represents a DOM element node as captured from the page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name, lowercase (e.g., "div", "p", "img")
    pub tag_name: String,

    /// Element attributes (e.g., id, class, role, src)
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Text runs and child elements, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,

    /// Computed style subset
    #[serde(default)]
    pub style: ComputedStyle,

    /// Whether `offsetParent` was non-null when captured
    #[serde(default = "default_true")]
    pub has_offset_parent: bool,

    /// Bounding client rect; `None` when layout is unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Load state for `img` elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageState>,

    /// Current value of `input`/`textarea` elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The computed style properties the classifier needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputedStyle {
    #[serde(default)]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
}

fn default_visibility() -> String {
    "visible".to_string()
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: String::new(),
            visibility: default_visibility(),
        }
    }
}

impl ComputedStyle {
    pub fn is_display_none(&self) -> bool {
        self.display.eq_ignore_ascii_case("none")
    }

    pub fn is_visibility_hidden(&self) -> bool {
        self.visibility.eq_ignore_ascii_case("hidden") || self.visibility.eq_ignore_ascii_case("collapse")
    }
}

/// Bounding box coordinates for an element, relative to the viewport
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Load state of an image element
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageState {
    pub complete: bool,
    pub natural_width: f64,
    pub natural_height: f64,
}

impl ImageState {
    pub fn is_loaded(&self) -> bool {
        self.complete && self.natural_width > 0.0 && self.natural_height > 0.0
    }
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: HashMap::new(),
            children: Vec::new(),
            style: ComputedStyle::default(),
            has_offset_parent: true,
            bounding_box: None,
            image: None,
            value: None,
        }
    }

    /// Builder method: set a single attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: append a text run
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(DomNode::Text(text.into()));
        self
    }

    /// Builder method: append a child element
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.add_child(child);
        self
    }

    /// Builder method: append several child elements
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children.extend(children.into_iter().map(DomNode::Element));
        self
    }

    /// Builder method: set computed display
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.style.display = display.into();
        self
    }

    /// Builder method: set computed visibility
    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.style.visibility = visibility.into();
        self
    }

    /// Builder method: set bounding box
    pub fn with_bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Builder method: mark as a fully loaded image with the given natural size
    pub fn with_loaded_image(mut self, natural_width: f64, natural_height: f64) -> Self {
        self.image = Some(ImageState {
            complete: true,
            natural_width,
            natural_height,
        });
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: ElementNode) {
        self.children.push(DomNode::Element(child));
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    /// Iterate over class tokens
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace())
            .into_iter()
            .flatten()
    }

    /// Get element ID
    pub fn id(&self) -> Option<&String> {
        self.attributes.get("id")
    }

    /// Get the ARIA role, if any
    pub fn role(&self) -> Option<&str> {
        self.attributes.get("role").map(|r| r.trim())
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Heading level for `h1`..`h6`
    pub fn heading_level(&self) -> Option<u8> {
        let mut chars = self.tag_name.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('h'), Some(digit @ '1'..='6'), None) => digit.to_digit(10).map(|d| d as u8),
            _ => None,
        }
    }

    /// Whether this element renders as its own block in `innerText`
    pub fn is_block(&self) -> bool {
        if self.style.display.is_empty() {
            return BLOCK_TAGS.contains(&self.tag_name.as_str());
        }
        !self.style.display.starts_with("inline") && !self.style.display.eq_ignore_ascii_case("contents")
    }

    /// Whether this element never contributes rendered text
    pub fn is_non_rendered_tag(&self) -> bool {
        NON_RENDERED_TAGS.contains(&self.tag_name.as_str())
    }
}

/// Tags treated as block-level when computed display is unknown
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "li", "main", "menu", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Tags whose content is never part of the rendered text
pub const NON_RENDERED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title", "meta", "link"];

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Width-to-height ratio; zero when height is zero
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 { self.width / self.height } else { 0.0 }
    }
}
