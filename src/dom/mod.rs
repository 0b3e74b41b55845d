//! DOM snapshot module
//!
//! This module captures the structure of a web page into an immutable,
//! preorder-indexed tree that the chunking pipeline can analyse without
//! touching the live page. It includes:
//! - ElementNode: serializable representation of captured elements
//! - DomTree: arena of elements with parent/child links and rendered text
//! - SelectorMap: structural CSS paths for re-locating elements in the page

pub mod element;
pub mod html;
pub mod selector_map;
pub mod tree;

pub use element::{BoundingBox, ComputedStyle, DomNode, ElementNode, ImageState};
pub use selector_map::{ElementSelector, SelectorMap};
pub use tree::{DomTree, NodeId, Viewport};
