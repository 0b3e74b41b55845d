//! Tunable thresholds and runtime settings
//!
//! Every admission threshold used by the chunking pipeline is an empirically chosen
//! number. Each one is exposed as a named constant and as an overridable field of
//! [`ChunkerConfig`], which can be loaded from a JSON file.

use crate::error::{ChunkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Minimum text length for a content-area candidate
pub const AREA_MIN_CHARS: usize = 10;
/// Minimum text length for a block to be admitted as a chunk
pub const CHUNK_MIN_CHARS: usize = 20;
/// Minimum text length for the leftover-content sweep
pub const REMAINING_MIN_CHARS: usize = 50;
/// Minimum word count for the leftover-content sweep
pub const REMAINING_MIN_WORDS: usize = 5;
/// Minimum text length for a `div` admitted by the density sweep
pub const DENSITY_MIN_CHARS: usize = 100;
/// A `div` with this many element children or more is treated as a layout shell
pub const DENSITY_MAX_CHILDREN: usize = 20;
/// Chunks shorter than this are dropped at finalization
pub const FINAL_MIN_CHARS: usize = 5;
/// Headings at or above this level start a new group in the assembler
pub const GROUP_HEADING_MAX_LEVEL: u8 = 3;

pub const IMAGE_MIN_SIZE: f64 = 50.0;
pub const IMAGE_MIN_ASPECT: f64 = 0.1;
pub const IMAGE_MAX_ASPECT: f64 = 10.0;
/// Images further than this many viewport heights from the top are ignored
pub const IMAGE_VIEWPORT_REACH: f64 = 2.0;
pub const FOCUS_HIGHLIGHT_MS: u64 = 3000;

pub const ANNOUNCE_PREVIEW_CHARS: usize = 100;

pub const HEALTH_TIMEOUT_MS: u64 = 3000;
pub const ANALYSIS_TIMEOUT_MS: u64 = 10000;

pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 200;

/// Complete configuration for a content script instance
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkerConfig {
    pub thresholds: Thresholds,
    pub images: ImageFilter,
    pub navigation: NavigationConfig,
    pub reading_order: ReadingOrder,
    pub analysis: AnalysisConfig,
    pub retry: RetryPolicy,
}

/// Character/word thresholds for each pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub area_min_chars: usize,
    pub chunk_min_chars: usize,
    pub remaining_min_chars: usize,
    pub remaining_min_words: usize,
    pub density_min_chars: usize,
    pub density_max_children: usize,
    pub final_min_chars: usize,
    pub group_heading_max_level: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            area_min_chars: AREA_MIN_CHARS,
            chunk_min_chars: CHUNK_MIN_CHARS,
            remaining_min_chars: REMAINING_MIN_CHARS,
            remaining_min_words: REMAINING_MIN_WORDS,
            density_min_chars: DENSITY_MIN_CHARS,
            density_max_children: DENSITY_MAX_CHILDREN,
            final_min_chars: FINAL_MIN_CHARS,
            group_heading_max_level: GROUP_HEADING_MAX_LEVEL,
        }
    }
}

/// Admission rules for meaningful images
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageFilter {
    pub min_size: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub viewport_reach: f64,
    pub focus_highlight_ms: u64,
    /// Emit image chunks during chunking
    pub include_in_chunks: bool,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self {
            min_size: IMAGE_MIN_SIZE,
            min_aspect: IMAGE_MIN_ASPECT,
            max_aspect: IMAGE_MAX_ASPECT,
            viewport_reach: IMAGE_VIEWPORT_REACH,
            focus_highlight_ms: FOCUS_HIGHLIGHT_MS,
            include_in_chunks: true,
        }
    }
}

impl ImageFilter {
    pub fn focus_highlight(&self) -> Duration {
        Duration::from_millis(self.focus_highlight_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    pub announce_preview_chars: usize,
    /// Focus the first chunk as soon as chunking completes
    pub auto_focus: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            announce_preview_chars: ANNOUNCE_PREVIEW_CHARS,
            auto_focus: true,
        }
    }
}

/// How chunk candidates are ordered
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingOrder {
    /// Strict depth-first, left-to-right document order
    #[default]
    Preorder,
    /// Stable sort by DOM depth, then area/leftover/image concatenation
    DepthSort,
}

/// Remote image-analysis endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL of the analysis service; analysis is disabled when unset
    pub endpoint: Option<String>,
    pub health_timeout_ms: u64,
    pub analysis_timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            health_timeout_ms: HEALTH_TIMEOUT_MS,
            analysis_timeout_ms: ANALYSIS_TIMEOUT_MS,
        }
    }
}

/// Bounded retry with linearly increasing delay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay_ms: RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

impl ChunkerConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: ChunkerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.images.min_aspect >= self.images.max_aspect {
            return Err(ChunkError::InvalidConfig(format!(
                "images.min_aspect ({}) must be below images.max_aspect ({})",
                self.images.min_aspect, self.images.max_aspect
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(ChunkError::InvalidConfig("retry.max_attempts must be at least 1".to_string()));
        }

        if !(1..=6).contains(&self.thresholds.group_heading_max_level) {
            return Err(ChunkError::InvalidConfig(format!(
                "thresholds.group_heading_max_level must be between 1 and 6, got {}",
                self.thresholds.group_heading_max_level
            )));
        }

        if let Some(endpoint) = &self.analysis.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ChunkError::InvalidConfig(format!(
                    "analysis.endpoint must be an http(s) URL, got {}",
                    endpoint
                )));
            }
        }

        Ok(())
    }
}
