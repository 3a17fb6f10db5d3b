use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::formatting::FormatMode;

pub const DEFAULT_LABEL_MAX_LENGTH: usize = 10;
pub const DEFAULT_TOP_COUNT: usize = 5;
pub const DEFAULT_COLOR_CYCLE: [&str; 5] = ["#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884d8"];

/// Tunables for view-model assembly. Unknown keys are ignored when parsing so
/// newer dashboards can pass options older builds do not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleOptions {
    /// Maximum label length before truncation; `0` keeps labels intact.
    #[serde(alias = "labelMaxLength")]
    pub label_max_length: usize,
    /// Rows kept from ranked input; `0` keeps every row.
    #[serde(alias = "topCount")]
    pub top_count: usize,
    #[serde(alias = "colorCycle")]
    pub color_cycle: Vec<String>,
    /// `false` renders monetary columns as plain numbers.
    pub currency: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            label_max_length: DEFAULT_LABEL_MAX_LENGTH,
            top_count: DEFAULT_TOP_COUNT,
            color_cycle: DEFAULT_COLOR_CYCLE.iter().map(ToString::to_string).collect(),
            currency: true,
        }
    }
}

impl AssembleOptions {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to parse assemble options")
    }

    pub fn color_for(&self, idx: usize) -> Option<&str> {
        if self.color_cycle.is_empty() {
            return None;
        }
        Some(self.color_cycle[idx % self.color_cycle.len()].as_str())
    }

    pub const fn resolve_mode(&self, mode: FormatMode) -> FormatMode {
        match mode {
            FormatMode::Currency if !self.currency => FormatMode::Plain,
            other => other,
        }
    }

    pub const fn row_limit(&self) -> usize {
        if self.top_count == 0 {
            usize::MAX
        } else {
            self.top_count
        }
    }
}
