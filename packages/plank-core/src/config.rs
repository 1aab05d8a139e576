/// Configuration for plank.
/// Reads config.json from ~/.config/plank/config.json (or platform equivalent).
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{Color, CompletedItemOrder, ContainerKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlankConfig {
    /// Where `LocalStore` keeps board documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Shape of the placeholder container/item on newly created boards.
    #[serde(default)]
    pub new_board: BoardTemplate,
}

/// Placeholder layout for a newly created board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardTemplate {
    #[serde(default)]
    pub container_title: String,
    #[serde(default)]
    pub container_kind: ContainerKind,
    #[serde(default)]
    pub completed_item_order: CompletedItemOrder,
    #[serde(default)]
    pub badge_color: Color,
    #[serde(default)]
    pub item_content: String,
}

impl Default for BoardTemplate {
    fn default() -> Self {
        Self {
            container_title: String::new(),
            container_kind: ContainerKind::Simple,
            completed_item_order: CompletedItemOrder::NoChange,
            badge_color: Color::default(),
            item_content: String::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plank")
        .join("boards")
}

impl Default for PlankConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            new_board: BoardTemplate::default(),
        }
    }
}

/// Default config path: ~/.config/plank/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plank")
        .join("config.json")
}

/// Load config from path. Returns default if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> PlankConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[plank.config] Failed to parse config {}: {}", path.display(), e);
            PlankConfig::default()
        }),
        Err(_) => {
            log::info!("[plank.config] No config at {}, using defaults", path.display());
            PlankConfig::default()
        }
    }
}

/// Write config as pretty JSON, creating parent directories as needed.
pub fn save_config(path: &Path, config: &PlankConfig) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, content)
}
