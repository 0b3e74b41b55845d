use crate::dom::{DomTree, NodeId};
use crate::error::{ChunkError, Result};
use crate::images::ImageTarget;
use crate::navigation::PageEffect;
use crate::surface::{ChunkMark, PageEvent, PageSurface};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Chunk markup as written on an in-memory element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedElement {
    pub node: NodeId,
    pub chunk_type: String,
    pub focused: bool,
    pub selected: bool,
    /// Text written by `replace_text`
    pub replaced_text: Option<String>,
    /// Whether the replacement went to a form field's `value`
    pub wrote_value: bool,
}

#[derive(Debug)]
struct MemoryPage {
    tree: DomTree,
    marks: IndexMap<String, MarkedElement>,
    events: VecDeque<PageEvent>,
    announcements: Vec<String>,
    focused_images: Vec<NodeId>,
    native_focus: Option<String>,
    /// Set by a navigation until the next `refresh`
    replaced: bool,
}

/// A page held entirely in memory
#[derive(Debug)]
pub struct MemorySurface {
    page: Mutex<MemoryPage>,
}

impl MemorySurface {
    pub fn new(tree: DomTree) -> Self {
        Self {
            page: Mutex::new(MemoryPage {
                tree,
                marks: IndexMap::new(),
                events: VecDeque::new(),
                announcements: Vec::new(),
                focused_images: Vec::new(),
                native_focus: None,
                replaced: false,
            }),
        }
    }

    pub fn from_html(html: &str) -> Result<Self> {
        Ok(Self::new(DomTree::from_html(html)?))
    }

    fn page(&self) -> MutexGuard<'_, MemoryPage> {
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Swap in a new document, dropping all markup
    pub fn load_html(&self, html: &str) -> Result<()> {
        let tree = DomTree::from_html(html)?;
        let mut page = self.page();
        page.tree = tree;
        page.marks.clear();
        page.native_focus = None;
        Ok(())
    }

    /// Navigate to a new document. Markup and queued events go with the old page.
    pub fn navigate_html(&self, html: &str) -> Result<()> {
        self.load_html(html)?;
        let mut page = self.page();
        page.events.clear();
        page.focused_images.clear();
        page.replaced = true;
        Ok(())
    }

    /// Queue an event as if the user produced it
    pub fn push_event(&self, event: PageEvent) {
        self.page().events.push_back(event);
    }

    pub fn press(&self, key: &str, shift: bool) {
        self.push_event(PageEvent::Key {
            key: key.to_string(),
            shift,
        });
    }

    pub fn click(&self, chunk_id: &str) {
        self.push_event(PageEvent::Click {
            chunk_id: chunk_id.to_string(),
        });
    }

    /// Detach a chunk's element, as a page re-render would
    pub fn detach(&self, chunk_id: &str) -> bool {
        self.page().marks.shift_remove(chunk_id).is_some()
    }

    pub fn marked_ids(&self) -> Vec<String> {
        self.page().marks.keys().cloned().collect()
    }

    pub fn mark(&self, chunk_id: &str) -> Option<MarkedElement> {
        self.page().marks.get(chunk_id).cloned()
    }

    pub fn focused_chunk(&self) -> Option<String> {
        self.page()
            .marks
            .iter()
            .find(|(_, mark)| mark.focused)
            .map(|(id, _)| id.clone())
    }

    /// Chunk that last received native focus
    pub fn native_focus(&self) -> Option<String> {
        self.page().native_focus.clone()
    }

    pub fn selected_chunks(&self) -> Vec<String> {
        self.page()
            .marks
            .iter()
            .filter(|(_, mark)| mark.selected)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn announcements(&self) -> Vec<String> {
        self.page().announcements.clone()
    }

    pub fn focused_images(&self) -> Vec<NodeId> {
        self.page().focused_images.clone()
    }

    fn with_mark(&self, chunk_id: &str, update: impl FnOnce(&mut MarkedElement)) -> Result<()> {
        let mut page = self.page();
        let mark = page
            .marks
            .get_mut(chunk_id)
            .ok_or_else(|| ChunkError::ElementNotFound(chunk_id.to_string()))?;
        update(mark);
        Ok(())
    }
}

impl PageSurface for MemorySurface {
    fn refresh(&self) -> Result<bool> {
        Ok(std::mem::take(&mut self.page().replaced))
    }

    fn snapshot(&self) -> Result<DomTree> {
        Ok(self.page().tree.clone())
    }

    fn reset_markup(&self) -> Result<()> {
        let mut page = self.page();
        page.marks.clear();
        page.native_focus = None;
        Ok(())
    }

    fn mark_chunks(&self, marks: &[ChunkMark]) -> Result<usize> {
        let mut page = self.page();
        let mut resolved = 0;
        for mark in marks {
            let Some(node) = page.tree.find_by_selector(&mark.css_path) else {
                log::warn!("Chunk {} path {} did not resolve", mark.chunk_id, mark.css_path);
                continue;
            };
            page.marks.insert(
                mark.chunk_id.clone(),
                MarkedElement {
                    node,
                    chunk_type: mark.chunk_type.clone(),
                    focused: false,
                    selected: false,
                    replaced_text: None,
                    wrote_value: false,
                },
            );
            resolved += 1;
        }
        Ok(resolved)
    }

    fn apply(&self, effect: &PageEffect) -> Result<()> {
        match effect {
            PageEffect::ClearFocus { chunk_id } => self.with_mark(chunk_id, |mark| mark.focused = false),
            PageEffect::Focus { chunk_id } => {
                self.with_mark(chunk_id, |mark| mark.focused = true)?;
                self.page().native_focus = Some(chunk_id.clone());
                Ok(())
            }
            PageEffect::Announce { message } => {
                self.page().announcements.push(message.clone());
                Ok(())
            }
            PageEffect::SetSelected { chunk_id, selected } => {
                self.with_mark(chunk_id, |mark| mark.selected = *selected)
            }
        }
    }

    fn replace_text(&self, chunk_id: &str, text: &str) -> Result<()> {
        let mut page = self.page();
        let node = page
            .marks
            .get(chunk_id)
            .map(|mark| mark.node)
            .ok_or_else(|| ChunkError::ElementNotFound(chunk_id.to_string()))?;
        let is_field = {
            let element = page.tree.element(node);
            element.is_tag("input") || element.is_tag("textarea")
        };

        if let Some(mark) = page.marks.get_mut(chunk_id) {
            mark.replaced_text = Some(text.to_string());
            mark.wrote_value = is_field;
        }
        Ok(())
    }

    fn focus_image(&self, target: &ImageTarget, _highlight: Duration) -> Result<()> {
        let mut page = self.page();
        let by_path = target
            .css_path
            .as_deref()
            .and_then(|path| page.tree.find_by_selector(path))
            .filter(|&node| page.tree.element(node).is_tag("img"));
        let node = by_path
            .or_else(|| page.tree.elements_by_tag("img").nth(target.position))
            .ok_or_else(|| ChunkError::ImageNotFound(format!("no image at position {}", target.position)))?;

        page.focused_images.push(node);
        Ok(())
    }

    fn drain_events(&self) -> Result<Vec<PageEvent>> {
        Ok(self.page().events.drain(..).collect())
    }
}
