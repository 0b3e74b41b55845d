//! Host side of the content script
//!
//! The host is whatever sits outside the page: a side panel, an MCP server, a CLI.
//! Commands flow in as [`Command`] values and selection changes flow back out as
//! [`Notification`] messages over a [`HostChannel`].

pub mod command;
pub mod retry;

pub use command::{Command, CommandResult};
pub use retry::{ensure_reachable, ContentTarget};

use crate::error::{ChunkError, Result};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard};

/// Snapshot of the current selection, sent whenever it changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionUpdate {
    pub selected_texts: Vec<String>,
    pub selected_count: usize,
    pub total_chunks: usize,
}

/// Unsolicited message from the content script to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    ChunkSelectionUpdate(SelectionUpdate),
}

pub trait HostChannel {
    /// Deliver a notification. A host that is not listening returns `HostUnavailable`.
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Records every notification it receives
#[derive(Debug, Default)]
pub struct MemoryHost {
    received: Mutex<Vec<Notification>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn received(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.received.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn latest(&self) -> Option<Notification> {
        self.received().last().cloned()
    }

    pub fn history(&self) -> Vec<Notification> {
        self.received().clone()
    }

    /// Remove and return everything received so far
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.received())
    }
}

impl HostChannel for MemoryHost {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.received().push(notification.clone());
        Ok(())
    }
}

/// Forwards notifications over an mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelHost {
    sender: Sender<Notification>,
}

impl ChannelHost {
    pub fn new(sender: Sender<Notification>) -> Self {
        Self { sender }
    }
}

impl HostChannel for ChannelHost {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.sender
            .send(notification.clone())
            .map_err(|_| ChunkError::HostUnavailable("receiver dropped".to_string()))
    }
}

/// A host that never listens
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl HostChannel for NullHost {
    fn notify(&self, _notification: &Notification) -> Result<()> {
        Err(ChunkError::HostUnavailable("no host attached".to_string()))
    }
}
