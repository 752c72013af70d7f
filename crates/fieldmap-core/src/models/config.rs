//! Configuration structures for extraction and mapping sessions.

use serde::{Deserialize, Serialize};

/// Main configuration for fieldmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldmapConfig {
    /// Rule engine configuration.
    pub extraction: ExtractionConfig,

    /// Mapping store configuration.
    pub store: StoreConfig,
}

/// Rule engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Page width used to scale fractional search zones when there are no fragments.
    pub default_page_width: f32,

    /// Page height used to scale fractional search zones when there are no fragments.
    pub default_page_height: f32,

    /// Minimum vertical overlap, as a share of the average height, for two fragments to
    /// share a text line.
    pub line_overlap_ratio: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_page_width: 1000.0,
            default_page_height: 1000.0,
            line_overlap_ratio: 0.5,
        }
    }
}

/// Mapping store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Run line-item invariant checks after every transaction.
    pub check_invariants: bool,

    /// Maximum undo depth (0 = unlimited).
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            check_invariants: true,
            history_limit: 0,
        }
    }
}

impl FieldmapConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
