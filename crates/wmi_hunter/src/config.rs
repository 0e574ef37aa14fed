//! Configuration for a hunt

use crate::error::{HunterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Note attached to bindings that ship with stock Windows installs.
pub const COMMON_BINDING_NOTE: &str =
    "Common binding based on consumer and filter names,possibly legitimate";

/// What to do when a captured span is not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Drop the candidate match, log it, keep scanning.
    #[default]
    Skip,
    /// Abort the whole run on the first undecodable span.
    Strict,
}

/// Binding ids containing `pattern` get `note` as their `info` text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRule {
    pub pattern: String,
    pub note: String,
}

/// Main configuration for a hunt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HunterConfig {
    /// Number of trailing chunks joined into each search window
    #[serde(default = "default_window_chunks")]
    pub window_chunks: usize,

    #[serde(default)]
    pub decode_policy: DecodePolicy,

    /// Allowlist of well-known bindings
    #[serde(default = "default_annotations")]
    pub binding_annotations: Vec<AnnotationRule>,
}

fn default_window_chunks() -> usize {
    4
}

fn default_annotations() -> Vec<AnnotationRule> {
    ["BVTConsumer-BVTFilter", "SCM Event Log Consumer-SCM Event Log Filter"]
        .into_iter()
        .map(|pattern| AnnotationRule {
            pattern: pattern.to_string(),
            note: COMMON_BINDING_NOTE.to_string(),
        })
        .collect()
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            window_chunks: default_window_chunks(),
            decode_policy: DecodePolicy::default(),
            binding_annotations: default_annotations(),
        }
    }
}

impl HunterConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HunterConfig =
            toml::from_str(&content).map_err(|e| HunterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| HunterError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_chunks == 0 {
            return Err(HunterError::Config(
                "window_chunks must be at least 1".to_string(),
            ));
        }
        if let Some(rule) = self.binding_annotations.iter().find(|r| r.pattern.is_empty()) {
            return Err(HunterError::Config(format!(
                "annotation pattern must not be empty (note: '{}')",
                rule.note
            )));
        }
        Ok(())
    }

    /// First note whose pattern occurs in `binding_id`, or "".
    pub fn annotation_for(&self, binding_id: &str) -> &str {
        self.binding_annotations
            .iter()
            .find(|rule| binding_id.contains(&rule.pattern))
            .map(|rule| rule.note.as_str())
            .unwrap_or("")
    }
}
