//! Meaningful-image detection
//!
//! An image is kept only when it is large enough, loaded, near the viewport,
//! sensibly proportioned and not obviously page chrome (icons, logos, avatars).

use crate::config::ImageFilter;
use crate::dom::html::declared_style;
use crate::dom::{DomTree, ElementNode, NodeId};
use crate::error::{ChunkError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sources matching this pattern are treated as decoration
pub const NON_CONTENT_SRC_PATTERN: &str = r"(?i)icon|logo|favicon|sprite|avatar|emoji|button|nav|menu|header|footer";

/// Serializable description of a detected image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedImage {
    /// `img_<position>_<stamp>`
    pub id: String,
    pub src: String,
    pub alt: String,
    pub width: f64,
    pub height: f64,

    /// Snapshot node at detection time
    #[serde(skip)]
    pub node: Option<NodeId>,
}

/// Build an image id from the image's position among all `img` elements
pub fn image_id(position: usize, stamp_ms: u128) -> String {
    format!("img_{}_{}", position, stamp_ms)
}

/// Recover the positional index encoded in an image id
pub fn parse_position(image_id: &str) -> Option<usize> {
    let mut parts = image_id.split('_');
    match (parts.next(), parts.next()) {
        (Some("img"), Some(position)) => position.parse().ok(),
        _ => None,
    }
}

/// Decode URL-encoded (non-base64) `data:image` sources
pub fn process_src(src: &str) -> String {
    if !src.starts_with("data:image/") || src.contains(";base64,") {
        return src.to_string();
    }

    match urlencoding::decode(src) {
        Ok(decoded) if decoded.starts_with("data:image/") => decoded.into_owned(),
        Ok(_) => src.to_string(),
        Err(e) => {
            log::debug!("Keeping undecodable data URL: {}", e);
            src.to_string()
        }
    }
}

/// Natural dimensions, falling back to the rendered box
fn reported_dimensions(element: &ElementNode) -> (f64, f64) {
    let bbox = element.bounding_box.unwrap_or_default();
    let natural = element.image.unwrap_or_default();
    let width = if natural.natural_width > 0.0 { natural.natural_width } else { bbox.width };
    let height = if natural.natural_height > 0.0 { natural.natural_height } else { bbox.height };
    (width, height)
}

pub struct ImageDetector {
    filter: ImageFilter,
    non_content: Regex,
}

impl ImageDetector {
    pub fn new(filter: ImageFilter) -> Result<Self> {
        let non_content = Regex::new(NON_CONTENT_SRC_PATTERN)
            .map_err(|e| ChunkError::InvalidConfig(format!("Invalid image source pattern: {}", e)))?;
        Ok(Self { filter, non_content })
    }

    /// Detect meaningful images in a snapshot, in document order
    pub fn detect(&self, tree: &DomTree, stamp_ms: u128) -> Vec<DetectedImage> {
        let images: Vec<DetectedImage> = tree
            .elements_by_tag("img")
            .enumerate()
            .filter(|&(_, id)| self.admits(tree, id))
            .map(|(position, id)| {
                let element = tree.element(id);
                let raw_src = element.get_attribute("src").map(String::as_str).unwrap_or_default();
                let (width, height) = reported_dimensions(element);

                DetectedImage {
                    id: image_id(position, stamp_ms),
                    src: process_src(raw_src.trim()),
                    alt: element.get_attribute("alt").cloned().unwrap_or_default(),
                    width,
                    height,
                    node: Some(id),
                }
            })
            .collect();

        log::info!("Detected {} meaningful images", images.len());
        images
    }

    /// Whether an `img` element passes every admission rule
    pub fn admits(&self, tree: &DomTree, id: NodeId) -> bool {
        let element = tree.element(id);
        let Some(bbox) = element.bounding_box else {
            return false;
        };

        let src = element.get_attribute("src").map(|s| s.trim()).unwrap_or_default();
        if src.is_empty() || self.non_content.is_match(src) {
            return false;
        }

        if !bbox.is_visible() || bbox.width < self.filter.min_size || bbox.height < self.filter.min_size {
            return false;
        }

        let declared = declared_style(element);
        if element.get_attribute("hidden").is_some()
            || declared.is_display_none()
            || declared.visibility.eq_ignore_ascii_case("hidden")
        {
            return false;
        }

        let aspect = bbox.aspect_ratio();
        if aspect <= self.filter.min_aspect || aspect >= self.filter.max_aspect {
            return false;
        }

        let viewport_height = tree.viewport.height;
        let in_viewport = bbox.top() < viewport_height && bbox.bottom() > 0.0;
        let near_viewport = bbox.top().abs() < viewport_height * self.filter.viewport_reach;
        if !(in_viewport || near_viewport) {
            return false;
        }

        element.image.is_some_and(|state| state.is_loaded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Viewport;

    fn img(src: &str) -> ElementNode {
        ElementNode::new("img")
            .with_attribute("src", src)
            .with_bounding_box(0.0, 100.0, 300.0, 200.0)
            .with_loaded_image(600.0, 400.0)
    }

    fn detect(children: Vec<ElementNode>) -> Vec<DetectedImage> {
        let tree = DomTree::with_viewport(
            ElementNode::new("body").with_children(children),
            Viewport { width: 1280.0, height: 800.0 },
        );
        ImageDetector::new(ImageFilter::default()).unwrap().detect(&tree, 42)
    }

    #[test]
    fn test_detects_content_image() {
        let images = detect(vec![img("https://x/cat.png").with_attribute("alt", "Cat")]);

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "img_0_42");
        assert_eq!(images[0].alt, "Cat");
        assert_eq!(images[0].width, 600.0);
        assert_eq!(images[0].node, Some(NodeId(1)));
    }

    #[test]
    fn test_rejects_decorative_and_broken_images() {
        let images = detect(vec![
            img("https://x/site-logo.png"),
            img(""),
            img("https://x/small.png").with_bounding_box(0.0, 0.0, 40.0, 40.0),
            img("https://x/banner.png").with_bounding_box(0.0, 0.0, 1200.0, 60.0),
            img("https://x/far.png").with_bounding_box(0.0, 5000.0, 300.0, 200.0),
            img("https://x/hidden.png").with_attribute("style", "display: none"),
            img("https://x/pending.png").with_loaded_image(0.0, 0.0),
            ElementNode::new("img").with_attribute("src", "https://x/unmeasured.png"),
        ]);
        assert!(images.is_empty());
    }

    #[test]
    fn test_ids_use_position_among_all_images() {
        let images = detect(vec![img("https://x/menu-icon.png"), img("https://x/photo.jpg")]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "img_1_42");
        assert_eq!(parse_position(&images[0].id), Some(1));
    }

    #[test]
    fn test_dimensions_fall_back_to_box() {
        let measured = ElementNode::new("img").with_bounding_box(0.0, 0.0, 120.0, 80.0);
        assert_eq!(reported_dimensions(&measured), (120.0, 80.0));

        let natural = measured.with_loaded_image(640.0, 480.0);
        assert_eq!(reported_dimensions(&natural), (640.0, 480.0));
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("img_3_1700000000000"), Some(3));
        assert_eq!(parse_position("img_x_1"), None);
        assert_eq!(parse_position("chunk-3"), None);
    }

    #[test]
    fn test_process_src() {
        assert_eq!(process_src("https://x/a.png"), "https://x/a.png");
        assert_eq!(process_src("data:image/png;base64,AAAA"), "data:image/png;base64,AAAA");
        assert_eq!(
            process_src("data:image/svg+xml,%3Csvg%3E%3C/svg%3E"),
            "data:image/svg+xml,<svg></svg>"
        );
    }
}
