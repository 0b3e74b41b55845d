use crate::chunking::ImageSource;
use crate::dom::{DomTree, NodeId};
use crate::images::detector::{parse_position, DetectedImage};
use indexmap::IndexMap;

/// A registered image, addressed by its structural CSS path
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredImage {
    pub css_path: String,
    /// Position among all `img` elements when detected
    pub position: usize,
    pub src: String,
}

/// How to find an image in the live page
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTarget {
    /// Path recorded at detection time, when the id is still registered
    pub css_path: Option<String>,
    /// Positional fallback into `document.querySelectorAll('img')`
    pub position: usize,
}

/// Image id to element map for the lifetime of one page
#[derive(Debug, Default, Clone)]
pub struct ImageRegistry {
    entries: IndexMap<String, RegisteredImage>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry with freshly detected images
    pub fn replace(&mut self, tree: &DomTree, images: &[DetectedImage]) {
        self.entries.clear();
        for image in images {
            let Some(node) = image.node else {
                continue;
            };
            let Some(selector) = tree.get_selector(node) else {
                log::warn!("Detected image {} has no selector", image.id);
                continue;
            };
            let Some(position) = parse_position(&image.id) else {
                continue;
            };

            self.entries.insert(
                image.id.clone(),
                RegisteredImage {
                    css_path: selector.css_selector.clone(),
                    position,
                    src: image.src.clone(),
                },
            );
        }
    }

    pub fn get(&self, image_id: &str) -> Option<&RegisteredImage> {
        self.entries.get(image_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Clearing {} registered images", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a registered image in a newer snapshot
    pub fn resolve(&self, tree: &DomTree, image_id: &str) -> Option<NodeId> {
        let entry = self.entries.get(image_id)?;
        tree.find_by_selector(&entry.css_path)
            .filter(|&node| tree.element(node).is_tag("img"))
    }

    /// Chunk sources for every registered image still present in the snapshot
    pub fn sources(&self, tree: &DomTree) -> Vec<ImageSource> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| match self.resolve(tree, id) {
                Some(node) => Some(ImageSource::new(node, entry.src.clone())),
                None => {
                    log::debug!("Skipping stale image {}", id);
                    None
                }
            })
            .collect()
    }

    /// Live-page target for an image id, using the positional fallback for unknown ids
    pub fn target(&self, image_id: &str) -> Option<ImageTarget> {
        match self.entries.get(image_id) {
            Some(entry) => Some(ImageTarget {
                css_path: Some(entry.css_path.clone()),
                position: entry.position,
            }),
            None => parse_position(image_id).map(|position| ImageTarget {
                css_path: None,
                position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;

    fn photo(src: &str) -> ElementNode {
        ElementNode::new("img")
            .with_attribute("src", src)
            .with_bounding_box(0.0, 0.0, 300.0, 200.0)
            .with_loaded_image(300.0, 200.0)
    }

    fn detected(id: &str, node: usize, src: &str) -> DetectedImage {
        DetectedImage {
            id: id.to_string(),
            src: src.to_string(),
            alt: String::new(),
            width: 300.0,
            height: 200.0,
            node: Some(NodeId(node)),
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let tree = DomTree::new(ElementNode::new("body").with_child(ElementNode::new("figure").with_child(photo("/a.png"))));
        let mut registry = ImageRegistry::new();
        registry.replace(&tree, &[detected("img_0_5", 2, "/a.png")]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("img_0_5").unwrap().css_path, "body > figure:nth-child(1) > img:nth-child(1)");
        assert_eq!(registry.resolve(&tree, "img_0_5"), Some(NodeId(2)));
        assert_eq!(registry.sources(&tree), vec![ImageSource::new(NodeId(2), "/a.png")]);
    }

    #[test]
    fn test_stale_entries_skipped() {
        let tree = DomTree::new(ElementNode::new("body").with_child(photo("/a.png")));
        let mut registry = ImageRegistry::new();
        registry.replace(&tree, &[detected("img_0_5", 1, "/a.png")]);

        let rebuilt = DomTree::new(ElementNode::new("body").with_child(ElementNode::new("p").with_text("gone")));
        assert_eq!(registry.resolve(&rebuilt, "img_0_5"), None);
        assert!(registry.sources(&rebuilt).is_empty());
    }

    #[test]
    fn test_target_falls_back_to_position() {
        let tree = DomTree::new(ElementNode::new("body").with_child(photo("/a.png")));
        let mut registry = ImageRegistry::new();
        registry.replace(&tree, &[detected("img_0_5", 1, "/a.png")]);

        let known = registry.target("img_0_5").unwrap();
        assert_eq!(known.css_path.as_deref(), Some("body > img:nth-child(1)"));

        registry.clear();
        assert!(registry.is_empty());
        let fallback = registry.target("img_4_5").unwrap();
        assert_eq!(fallback, ImageTarget { css_path: None, position: 4 });
        assert!(registry.target("bogus").is_none());
    }
}
