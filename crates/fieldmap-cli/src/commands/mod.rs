//! Subcommands and the file loading they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod replay;

use std::fs;
use std::path::Path;

use serde::Deserialize;

use fieldmap_core::models::config::FieldmapConfig;
use fieldmap_core::models::fragment::SourceFragment;
use fieldmap_core::models::layout::LayoutMap;

/// Fragment files hold either a bare list or an object with a `fragments` list.
#[derive(Deserialize)]
#[serde(untagged)]
enum FragmentFile {
    List(Vec<SourceFragment>),
    Wrapped { fragments: Vec<SourceFragment> },
}

/// Load configuration from an explicit path, or fall back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FieldmapConfig> {
    match config_path {
        Some(path) => Ok(FieldmapConfig::from_file(Path::new(path))?),
        None => Ok(FieldmapConfig::default()),
    }
}

/// Read a fragment file.
pub fn load_fragments(path: &Path) -> anyhow::Result<Vec<SourceFragment>> {
    if !path.exists() {
        anyhow::bail!("Fragment file not found: {}", path.display());
    }

    let content = fs::read_to_string(path)?;
    let file: FragmentFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid fragment file {}: {}", path.display(), e))?;

    Ok(match file {
        FragmentFile::List(fragments) => fragments,
        FragmentFile::Wrapped { fragments } => fragments,
    })
}

/// Read a layout map.
pub fn load_layout(path: &Path) -> anyhow::Result<LayoutMap> {
    if !path.exists() {
        anyhow::bail!("Layout file not found: {}", path.display());
    }

    LayoutMap::from_file(path)
        .map_err(|e| anyhow::anyhow!("Invalid layout file {}: {}", path.display(), e))
}
