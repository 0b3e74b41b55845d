use crate::config::RetryPolicy;
use crate::dom::DomTree;
use crate::error::{ChunkError, Result};
use crate::host::retry::{ensure_reachable, ContentTarget};
use crate::images::ImageTarget;
use crate::navigation::PageEffect;
use crate::surface::{ChunkMark, PageEvent, PageSurface};
use headless_chrome::Tab;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const PAGE_RUNTIME: &str = include_str!("page_runtime.js");

/// A live Chrome tab, driven through an injected page runtime
pub struct TabSurface {
    tab: Arc<Tab>,
    retry: RetryPolicy,
    /// The runtime had to be reinstalled, so the tab holds a new document
    replaced: AtomicBool,
}

impl TabSurface {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self {
            tab,
            retry: RetryPolicy::default(),
            replaced: AtomicBool::new(false),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    fn evaluate(&self, expression: &str) -> Result<Option<Value>> {
        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| ChunkError::EvaluationFailed(e.to_string()))?;
        Ok(result.value)
    }

    /// Handshake with the runtime. A ping that only succeeds after reinjection
    /// means the previous document is gone.
    fn reach(&self) -> Result<()> {
        if ensure_reachable(self, &self.retry)? > 1 {
            log::debug!("Page runtime reinstalled, tab holds a new document");
            self.replaced.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Run a runtime call after making sure the runtime is installed
    fn call(&self, expression: &str) -> Result<Value> {
        self.reach()?;
        Ok(self.evaluate(expression)?.unwrap_or(Value::Null))
    }

    /// Run a runtime call returning `true` when its target element resolved
    fn call_resolving(&self, expression: &str) -> Result<bool> {
        Ok(self.call(expression)?.as_bool().unwrap_or(false))
    }
}

impl ContentTarget for TabSurface {
    fn ping(&self) -> Result<()> {
        let installed = self.evaluate("!!(window.__pageChunker && window.__pageChunker.version === 1)")?;
        match installed {
            Some(Value::Bool(true)) => Ok(()),
            _ => Err(ChunkError::EvaluationFailed("page runtime not installed".to_string())),
        }
    }

    fn inject(&self) -> Result<()> {
        self.evaluate(PAGE_RUNTIME)?;
        Ok(())
    }
}

/// Quote a string as a JavaScript literal
fn js(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

impl PageSurface for TabSurface {
    fn refresh(&self) -> Result<bool> {
        self.reach()?;
        Ok(self.replaced.swap(false, Ordering::SeqCst))
    }

    fn snapshot(&self) -> Result<DomTree> {
        self.reach()?;
        DomTree::from_tab(&self.tab)
    }

    fn reset_markup(&self) -> Result<()> {
        self.call("window.__pageChunker.reset()")?;
        Ok(())
    }

    fn mark_chunks(&self, marks: &[ChunkMark]) -> Result<usize> {
        let payload = serde_json::to_string(marks)?;
        let resolved = self.call(&format!("window.__pageChunker.mark({})", payload))?;
        Ok(resolved.as_u64().unwrap_or(0) as usize)
    }

    fn apply(&self, effect: &PageEffect) -> Result<()> {
        let (expression, chunk_id) = match effect {
            PageEffect::ClearFocus { chunk_id } => {
                (format!("window.__pageChunker.clearFocus({})", js(chunk_id)?), Some(chunk_id))
            }
            PageEffect::Focus { chunk_id } => (format!("window.__pageChunker.focus({})", js(chunk_id)?), Some(chunk_id)),
            PageEffect::Announce { message } => (format!("window.__pageChunker.announce({})", js(message)?), None),
            PageEffect::SetSelected { chunk_id, selected } => (
                format!("window.__pageChunker.setSelected({}, {})", js(chunk_id)?, selected),
                Some(chunk_id),
            ),
        };

        match (self.call_resolving(&expression)?, chunk_id) {
            (false, Some(chunk_id)) => Err(ChunkError::ElementNotFound(chunk_id.clone())),
            _ => Ok(()),
        }
    }

    fn replace_text(&self, chunk_id: &str, text: &str) -> Result<()> {
        let expression = format!("window.__pageChunker.replaceText({}, {})", js(chunk_id)?, js(text)?);
        if self.call_resolving(&expression)? {
            Ok(())
        } else {
            Err(ChunkError::ElementNotFound(chunk_id.to_string()))
        }
    }

    fn focus_image(&self, target: &ImageTarget, highlight: Duration) -> Result<()> {
        let path = match &target.css_path {
            Some(path) => js(path)?,
            None => "null".to_string(),
        };
        let expression = format!(
            "window.__pageChunker.focusImage({}, {}, {})",
            path,
            target.position,
            highlight.as_millis()
        );

        if self.call_resolving(&expression)? {
            Ok(())
        } else {
            Err(ChunkError::ImageNotFound(format!("no image at position {}", target.position)))
        }
    }

    fn drain_events(&self) -> Result<Vec<PageEvent>> {
        let raw = self.call("window.__pageChunker.drain()")?;
        let json = raw
            .as_str()
            .ok_or_else(|| ChunkError::EvaluationFailed("event queue did not return a string".to_string()))?;

        let values: Vec<Value> = serde_json::from_str(json)?;
        Ok(values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!("Skipping malformed page event: {}", e);
                    None
                }
            })
            .collect())
    }
}
