//! Per-page chunking session state

use crate::chunking::Chunk;
use crate::images::ImageRegistry;
use indexmap::IndexSet;

/// Everything the content script knows about the current page
#[derive(Debug, Default, Clone)]
pub struct ChunkingSession {
    chunks: Vec<Chunk>,
    current_index: Option<usize>,
    /// Selected chunk ids in the order they were selected
    selected: IndexSet<String>,
    pub images: ImageRegistry,
}

impl ChunkingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly built chunk list, dropping focus and selection
    pub fn replace_chunks(&mut self, chunks: Vec<Chunk>) {
        self.chunks = chunks;
        self.current_index = None;
        self.selected.clear();
    }

    /// Forget everything, including detected images
    pub fn clear(&mut self) {
        self.replace_chunks(Vec::new());
        self.images.clear();
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn chunk_mut(&mut self, index: usize) -> Option<&mut Chunk> {
        self.chunks.get_mut(index)
    }

    pub fn position_of(&self, chunk_id: &str) -> Option<usize> {
        self.chunks.iter().position(|chunk| chunk.id == chunk_id)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current(&self) -> Option<&Chunk> {
        self.current_index.and_then(|index| self.chunks.get(index))
    }

    /// Move focus; out-of-range indices clear it
    pub fn set_current(&mut self, index: Option<usize>) {
        self.current_index = index.filter(|&i| i < self.chunks.len());
    }

    pub fn is_selected(&self, chunk_id: &str) -> bool {
        self.selected.contains(chunk_id)
    }

    /// Flip a chunk's selection, returning whether it is now selected.
    /// Ids unknown to the session are ignored and return `None`.
    pub fn toggle_selection(&mut self, chunk_id: &str) -> Option<bool> {
        self.position_of(chunk_id)?;
        if self.selected.shift_remove(chunk_id) {
            Some(false)
        } else {
            self.selected.insert(chunk_id.to_string());
            Some(true)
        }
    }

    /// Clear the selection, returning the ids that were selected
    pub fn clear_selection(&mut self) -> Vec<String> {
        self.selected.drain(..).collect()
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Texts of selected chunks in selection order, skipping empty texts
    pub fn selected_texts(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter_map(|id| self.chunks.iter().find(|chunk| &chunk.id == id))
            .map(|chunk| chunk.text.clone())
            .filter(|text| !text.is_empty())
            .collect()
    }
}
