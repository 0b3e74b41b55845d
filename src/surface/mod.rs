//! Page surfaces
//!
//! A [`PageSurface`] is everything the content script can do to a page:
//! capture a snapshot, write chunk markup, apply navigation effects, replace
//! text, focus images, and hand back queued user events.
//! - TabSurface: a live Chrome tab driven over CDP
//! - MemorySurface: an in-memory page used by tests and offline runs

pub mod memory;
pub mod tab;

pub use memory::MemorySurface;
pub use tab::TabSurface;

use crate::dom::DomTree;
use crate::error::Result;
use crate::images::ImageTarget;
use crate::navigation::PageEffect;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// CSS classes written by the page runtime
pub const HIGHLIGHT_CLASS: &str = "page-chunk-highlight";
pub const FOCUSED_CLASS: &str = "page-chunk-focused";
pub const SELECTED_CLASS: &str = "page-chunk-selected";

/// Markup instruction for one admitted chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMark {
    pub chunk_id: String,
    pub chunk_type: String,
    /// Structural path of the chunk's element in the snapshot it was built from
    pub css_path: String,
}

/// User or lifecycle event queued by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEvent {
    /// `KeyboardEvent.key` and the shift modifier
    Key { key: String, shift: bool },
    Click { chunk_id: String },
    VisibilityHidden,
    Unload,
}

pub trait PageSurface {
    /// Make sure the page can take calls. Returns `true` when it now holds a
    /// different document than at the previous check.
    fn refresh(&self) -> Result<bool>;

    /// Capture the current DOM
    fn snapshot(&self) -> Result<DomTree>;

    /// Remove chunk markup left by an earlier chunking pass
    fn reset_markup(&self) -> Result<()>;

    /// Mark chunk elements, returning how many marks resolved
    fn mark_chunks(&self, marks: &[ChunkMark]) -> Result<usize>;

    fn apply(&self, effect: &PageEffect) -> Result<()>;

    /// Write text into a chunk's element: `value` for form fields, text content otherwise.
    /// Fails with `ElementNotFound` when the chunk is no longer in the page.
    fn replace_text(&self, chunk_id: &str, text: &str) -> Result<()>;

    /// Scroll an image into view and highlight it temporarily.
    /// Fails with `ImageNotFound` when neither the path nor the position resolves.
    fn focus_image(&self, target: &ImageTarget, highlight: Duration) -> Result<()>;

    /// Take every event queued since the last call, in delivery order
    fn drain_events(&self) -> Result<Vec<PageEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_event_wire_format() {
        let event: PageEvent = serde_json::from_str(r#"{"kind":"key","key":"Tab","shift":true}"#).unwrap();
        assert_eq!(event, PageEvent::Key { key: "Tab".to_string(), shift: true });

        let event: PageEvent = serde_json::from_str(r#"{"kind":"click","chunk_id":"chunk-1"}"#).unwrap();
        assert_eq!(event, PageEvent::Click { chunk_id: "chunk-1".to_string() });

        let event: PageEvent = serde_json::from_str(r#"{"kind":"visibility_hidden"}"#).unwrap();
        assert_eq!(event, PageEvent::VisibilityHidden);
    }
}
