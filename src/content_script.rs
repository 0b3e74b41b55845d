//! The content script: one instance per page load
//!
//! Owns the [`ChunkingSession`] and wires the pure pipeline and navigation
//! state machine to a [`PageSurface`] and a [`HostChannel`].

use crate::chunking::{self, Chunk};
use crate::config::ChunkerConfig;
use crate::error::{ChunkError, Result};
use crate::host::{Command, CommandResult, HostChannel, Notification, SelectionUpdate};
use crate::images::{AnalysisClient, ImageDetector};
use crate::navigation::{self, Key, KeyEvent, Transition};
use crate::session::ChunkingSession;
use crate::surface::{ChunkMark, PageEvent, PageSurface};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

pub const INVALID_CHUNK_INDEX: &str = "Invalid chunk index";
pub const ELEMENT_NOT_FOUND: &str = "Element not found";
pub const IMAGE_NOT_FOUND: &str = "Image not found";

pub struct ContentScript<P: PageSurface, H: HostChannel> {
    surface: P,
    host: H,
    session: ChunkingSession,
    config: ChunkerConfig,
    detector: ImageDetector,
}

impl<P: PageSurface, H: HostChannel> ContentScript<P, H> {
    pub fn new(surface: P, host: H, config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        let detector = ImageDetector::new(config.images.clone())?;

        Ok(Self {
            surface,
            host,
            session: ChunkingSession::new(),
            config,
            detector,
        })
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn session(&self) -> &ChunkingSession {
        &self.session
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Run one command. Every failure is folded into the result.
    pub fn dispatch(&mut self, command: Command) -> CommandResult {
        log::info!("Received command: {}", command.name());
        self.sync_document();

        match command {
            Command::ChunkWebpage => self.chunk_webpage(),
            Command::ClearChunkSelections => {
                let transition = navigation::clear_selections(&mut self.session);
                self.apply_transition(&transition);
                CommandResult::success()
            }
            Command::GetSelectedChunks => CommandResult::success_with(json!({
                "selectedTexts": self.session.selected_texts(),
                "selectedCount": self.session.selected_count(),
            })),
            Command::ExitChunkNavigation => {
                let transition = navigation::exit(&mut self.session);
                self.apply_transition(&transition);
                CommandResult::success()
            }
            Command::GetCurrentActiveChunk => {
                let current = self.session.current();
                CommandResult::success_with(json!({
                    "chunkText": current.map(|chunk| chunk.text.clone()),
                    "chunkIndex": current.map(|chunk| chunk.index),
                }))
            }
            Command::ReplaceChunkText {
                chunk_index,
                translated_text,
            } => self.replace_chunk_text(chunk_index, &translated_text),
            Command::DetectImages => self.detect_images(),
            Command::FocusOnImage { image_id } => self.focus_on_image(&image_id),
            Command::Ping => CommandResult::success_with(json!({ "message": "Content script is loaded" })),
        }
    }

    fn chunk_webpage(&mut self) -> CommandResult {
        match self.rechunk() {
            Ok(count) => CommandResult::success_with(json!({ "chunkCount": count })),
            Err(e) => {
                log::warn!("Chunking failed: {}", e);
                CommandResult::failure(e.to_string())
            }
        }
    }

    /// Snapshot, chunk and mark up the page, replacing the session's chunks.
    ///
    /// On failure the session is left without chunks, since the old markup may
    /// already be gone from the page.
    pub fn rechunk(&mut self) -> Result<usize> {
        let result = self.build_chunks();
        if result.is_err() && !self.session.is_empty() {
            self.session.replace_chunks(Vec::new());
        }
        result
    }

    fn build_chunks(&mut self) -> Result<usize> {
        self.surface.reset_markup()?;
        let tree = self.surface.snapshot()?;

        let mut sources = self.session.images.sources(&tree);
        if sources.is_empty() {
            let detected = self.detector.detect(&tree, now_ms());
            self.session.images.replace(&tree, &detected);
            sources = self.session.images.sources(&tree);
        }

        let chunks = chunking::chunk_document(&tree, &sources, &self.config);
        let marks: Vec<ChunkMark> = chunks
            .iter()
            .filter_map(|chunk| {
                let selector = tree.get_selector(chunk.node?)?;
                Some(ChunkMark {
                    chunk_id: chunk.id.clone(),
                    chunk_type: chunk.chunk_type.to_string(),
                    css_path: selector.css_selector.clone(),
                })
            })
            .collect();

        let resolved = self.surface.mark_chunks(&marks)?;
        if resolved < chunks.len() {
            log::warn!("Only {} of {} chunks were marked in the page", resolved, chunks.len());
        }

        let count = chunks.len();
        self.session.replace_chunks(chunks);

        if self.config.navigation.auto_focus {
            let transition = navigation::focus_first(&mut self.session, &self.config.navigation);
            self.apply_transition(&transition);
        }

        Ok(count)
    }

    fn replace_chunk_text(&mut self, chunk_index: i64, text: &str) -> CommandResult {
        let Some(index) = usize::try_from(chunk_index).ok().filter(|&i| i < self.session.len()) else {
            log::debug!("{}", ChunkError::InvalidChunkIndex(chunk_index));
            return CommandResult::failure(INVALID_CHUNK_INDEX);
        };

        let chunk_id = match self.session.chunk(index) {
            Some(chunk) => chunk.id.clone(),
            None => return CommandResult::failure(INVALID_CHUNK_INDEX),
        };

        match self.surface.replace_text(&chunk_id, text) {
            Ok(()) => {
                if let Some(chunk) = self.session.chunk_mut(index) {
                    chunk.text = text.to_string();
                }
                CommandResult::success_with(json!({ "chunkIndex": index }))
            }
            Err(ChunkError::ElementNotFound(_)) => CommandResult::failure(ELEMENT_NOT_FOUND),
            Err(e) => CommandResult::failure(e.to_string()),
        }
    }

    fn detect_images(&mut self) -> CommandResult {
        let tree = match self.surface.snapshot() {
            Ok(tree) => tree,
            Err(e) => return CommandResult::failure(e.to_string()),
        };

        let images = self.detector.detect(&tree, now_ms());
        self.session.images.replace(&tree, &images);
        log::info!("Detected {} images", images.len());

        if let Some(client) = AnalysisClient::from_config(&self.config.analysis) {
            client.spawn(images.iter().map(|image| image.src.clone()).collect());
        }

        CommandResult::success_with(json!({ "images": images }))
    }

    fn focus_on_image(&mut self, image_id: &str) -> CommandResult {
        let Some(target) = self.session.images.target(image_id) else {
            return CommandResult::failure(IMAGE_NOT_FOUND);
        };

        match self.surface.focus_image(&target, self.config.images.focus_highlight()) {
            Ok(()) => CommandResult::success_with(json!({ "message": "Image focused" })),
            Err(ChunkError::ImageNotFound(_)) => CommandResult::failure(IMAGE_NOT_FOUND),
            Err(e) => CommandResult::failure(e.to_string()),
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> Transition {
        let transition = navigation::handle_key(&mut self.session, event, &self.config.navigation);
        self.apply_transition(&transition);
        transition
    }

    pub fn handle_event(&mut self, event: PageEvent) -> Transition {
        match event {
            PageEvent::Key { key, shift } => {
                let mut event = KeyEvent::new(Key::from_dom(&key));
                event.shift = shift;
                self.handle_key(&event)
            }
            PageEvent::Click { chunk_id } => {
                let transition = navigation::toggle(&mut self.session, &chunk_id);
                self.apply_transition(&transition);
                transition
            }
            PageEvent::VisibilityHidden => {
                log::debug!("Page hidden, dropping {} registered images", self.session.images.len());
                self.session.images.clear();
                Transition::ignored()
            }
            PageEvent::Unload => {
                log::debug!("Page unloading, dropping {} chunks", self.session.len());
                self.session.clear();
                Transition::ignored()
            }
        }
    }

    /// Drain queued page events and handle them in order, returning how many were handled
    pub fn pump_events(&mut self) -> Result<usize> {
        self.sync_document();
        let events = self.surface.drain_events()?;
        let mut handled = 0;
        for event in events {
            if self.handle_event(event).handled {
                handled += 1;
            }
        }
        Ok(handled)
    }

    /// Drop the session when the page has moved on to a new document
    fn sync_document(&mut self) {
        match self.surface.refresh() {
            Ok(true) if !self.session.is_empty() || !self.session.images.is_empty() => {
                log::info!("Page holds a new document, dropping {} chunks", self.session.len());
                self.session.clear();
            }
            Ok(_) => {}
            Err(e) => log::debug!("Page not reachable: {}", e),
        }
    }

    fn apply_transition(&self, transition: &Transition) {
        for effect in &transition.effects {
            if let Err(e) = self.surface.apply(effect) {
                log::debug!("Failed to apply {:?}: {}", effect, e);
            }
        }

        if transition.selection_changed {
            self.report_selection();
        }
    }

    pub fn selection_update(&self) -> SelectionUpdate {
        SelectionUpdate {
            selected_texts: self.session.selected_texts(),
            selected_count: self.session.selected_count(),
            total_chunks: self.session.len(),
        }
    }

    /// Tell the host about the current selection. Delivery is best effort.
    fn report_selection(&self) {
        let notification = Notification::ChunkSelectionUpdate(self.selection_update());
        if let Err(e) = self.host.notify(&notification) {
            log::debug!("Selection update not delivered: {}", e);
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        self.session.chunks()
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
