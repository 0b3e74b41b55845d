//! Offline snapshots from static HTML
//!
//! Without a layout engine, visibility comes from markup alone: the `hidden`
//! attribute and inline `display`/`visibility` declarations. Element boxes are
//! unknown (and count as rendered), except for images that carry numeric
//! `width`/`height` attributes.

use crate::dom::element::{BoundingBox, ComputedStyle, DomNode, ElementNode, ImageState};
use crate::dom::tree::DomTree;
use crate::error::{ChunkError, Result};
use scraper::{ElementRef, Html, Node};

impl DomTree {
    /// Build a snapshot of a static HTML document, rooted at its `body`
    pub fn from_html(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let body = document
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name().eq_ignore_ascii_case("body"))
            .ok_or_else(|| ChunkError::DomParseFailed("Document has no body element".to_string()))?;

        Ok(DomTree::new(convert(body)))
    }
}

fn convert(element: ElementRef<'_>) -> ElementNode {
    let value = element.value();
    let mut node = ElementNode::new(value.name());
    for (key, attr) in value.attrs() {
        node.add_attribute(key, attr);
    }
    node.style = declared_style(&node);

    if node.is_tag("img") {
        let width = numeric_attribute(&node, "width");
        let height = numeric_attribute(&node, "height");
        if let (Some(width), Some(height)) = (width, height) {
            node.bounding_box = Some(BoundingBox::new(0.0, 0.0, width, height));
            node.image = Some(ImageState {
                complete: true,
                natural_width: width,
                natural_height: height,
            });
        }
    }

    if node.is_non_rendered_tag() {
        return node;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => node.children.push(DomNode::Text(String::from(&*text.text))),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    node.add_child(convert(child_element));
                }
            }
            _ => {}
        }
    }

    if node.is_tag("input") {
        node.value = node.get_attribute("value").cloned();
    } else if node.is_tag("textarea") {
        node.value = Some(element.text().collect());
    }

    node
}

/// Derive display/visibility from the `hidden` attribute and inline styles
pub(crate) fn declared_style(node: &ElementNode) -> ComputedStyle {
    let mut style = ComputedStyle::default();

    if let Some(inline) = node.get_attribute("style") {
        for declaration in inline.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
            match property.trim().to_ascii_lowercase().as_str() {
                "display" => style.display = value,
                "visibility" => style.visibility = value,
                _ => {}
            }
        }
    }

    if node.get_attribute("hidden").is_some() || node.is_non_rendered_tag() {
        style.display = "none".to_string();
    }

    style
}

fn numeric_attribute(node: &ElementNode, key: &str) -> Option<f64> {
    node.get_attribute(key)?
        .trim()
        .trim_end_matches("px")
        .parse::<f64>()
        .ok()
}
