//! Keyboard navigation state machine
//!
//! Transitions are pure functions over a [`ChunkingSession`]. Each returns the
//! [`PageEffect`]s the page surface must apply and whether the selection
//! changed, so the caller decides when to report to the host.

use crate::chunking::Chunk;
use crate::config::NavigationConfig;
use crate::session::ChunkingSession;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Keys the navigator reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Tab,
    Enter,
    Space,
    Escape,
    /// Any key the navigator ignores
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            " " | "Spacebar" | "Space" => Key::Space,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Navigation state derived from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// No chunks
    Idle,
    /// Chunks present, nothing focused
    Ready,
    Focused(usize),
}

pub fn state(session: &ChunkingSession) -> NavState {
    if session.is_empty() {
        return NavState::Idle;
    }
    match session.current_index() {
        Some(index) => NavState::Focused(index),
        None => NavState::Ready,
    }
}

/// A page mutation requested by a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PageEffect {
    ClearFocus { chunk_id: String },
    Focus { chunk_id: String },
    Announce { message: String },
    SetSelected { chunk_id: String, selected: bool },
}

/// Outcome of one navigation step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Whether the input was consumed; unhandled keys keep their default action
    pub handled: bool,
    pub effects: Vec<PageEffect>,
    pub selection_changed: bool,
}

impl Transition {
    pub fn ignored() -> Self {
        Self::default()
    }

    fn handled(effects: Vec<PageEffect>) -> Self {
        Self {
            handled: true,
            effects,
            selection_changed: false,
        }
    }
}

pub fn handle_key(session: &mut ChunkingSession, event: &KeyEvent, config: &NavigationConfig) -> Transition {
    if session.is_empty() {
        return Transition::ignored();
    }

    match event.key {
        Key::Tab if event.shift => move_focus(session, false, config),
        Key::Tab => move_focus(session, true, config),
        Key::Enter | Key::Space => match session.current() {
            Some(chunk) => {
                let chunk_id = chunk.id.clone();
                toggle(session, &chunk_id)
            }
            None => Transition::ignored(),
        },
        Key::Escape => exit(session),
        Key::Other => Transition::ignored(),
    }
}

/// Step focus circularly forward or backward
pub fn move_focus(session: &mut ChunkingSession, forward: bool, config: &NavigationConfig) -> Transition {
    let total = session.len();
    if total == 0 {
        return Transition::ignored();
    }

    let next = match (session.current_index(), forward) {
        (Some(index), true) => (index + 1) % total,
        (None, true) => 0,
        (Some(0) | None, false) => total - 1,
        (Some(index), false) => index - 1,
    };
    log::debug!("Navigating to chunk {}/{}", next + 1, total);
    focus_index(session, next, config)
}

/// Focus a specific chunk, clearing focus from the previous one
pub fn focus_index(session: &mut ChunkingSession, index: usize, config: &NavigationConfig) -> Transition {
    let total = session.len();
    let Some(chunk) = session.chunk(index) else {
        return Transition::ignored();
    };

    let mut effects = Vec::with_capacity(3);
    if let Some(previous) = session.current() {
        effects.push(PageEffect::ClearFocus {
            chunk_id: previous.id.clone(),
        });
    }
    effects.push(PageEffect::Focus {
        chunk_id: chunk.id.clone(),
    });
    effects.push(PageEffect::Announce {
        message: announcement(chunk, total, config.announce_preview_chars),
    });

    session.set_current(Some(index));
    Transition::handled(effects)
}

/// Focus chunk 0 right after chunking
pub fn focus_first(session: &mut ChunkingSession, config: &NavigationConfig) -> Transition {
    focus_index(session, 0, config)
}

/// Flip a chunk's selection; unknown ids are ignored
pub fn toggle(session: &mut ChunkingSession, chunk_id: &str) -> Transition {
    match session.toggle_selection(chunk_id) {
        Some(selected) => {
            log::debug!("{} chunk {}", if selected { "Selected" } else { "Deselected" }, chunk_id);
            Transition {
                handled: true,
                effects: vec![PageEffect::SetSelected {
                    chunk_id: chunk_id.to_string(),
                    selected,
                }],
                selection_changed: true,
            }
        }
        None => Transition::ignored(),
    }
}

/// Drop keyboard focus without touching the selection
pub fn exit(session: &mut ChunkingSession) -> Transition {
    let effects = session
        .current()
        .map(|chunk| PageEffect::ClearFocus {
            chunk_id: chunk.id.clone(),
        })
        .into_iter()
        .collect();
    session.set_current(None);
    Transition::handled(effects)
}

/// Deselect everything; always reported so the host sees the empty selection
pub fn clear_selections(session: &mut ChunkingSession) -> Transition {
    let effects = session
        .clear_selection()
        .into_iter()
        .map(|chunk_id| PageEffect::SetSelected {
            chunk_id,
            selected: false,
        })
        .collect();
    Transition {
        handled: true,
        effects,
        selection_changed: true,
    }
}

/// Screen-reader text for a focused chunk
pub fn announcement(chunk: &Chunk, total: usize, preview_chars: usize) -> String {
    let kind = if chunk.is_heading() {
        format!("heading level {}", chunk.level)
    } else if chunk.is_image() {
        "image".to_string()
    } else {
        "text".to_string()
    };

    let mut preview: String = chunk.text.chars().take(preview_chars).collect();
    if chunk.text.chars().count() > preview_chars {
        preview.push_str("...");
    }

    format!("Chunk {} of {}, {}. {}", chunk.index + 1, total, kind, preview)
}
