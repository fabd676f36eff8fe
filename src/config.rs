use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::node::Node;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSyncConfig {
    pub database: Option<String>,
    #[serde(default)]
    pub sync: SyncSettings,
    /// Field editor kind -> names of the extractors that read it
    #[serde(default = "default_extractor_bindings")]
    pub extractors: BTreeMap<String, Vec<String>>,
}

impl Default for MediaSyncConfig {
    fn default() -> Self {
        Self {
            database: None,
            sync: SyncSettings::default(),
            extractors: default_extractor_bindings(),
        }
    }
}

/// Behaviour switches read by the reconcilers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Rename a node's folder when the node is renamed
    pub rename_media: bool,
    /// Create missing folders/relations lazily when an operation needs them
    pub check_for_missing_relations: bool,
    /// Trash/delete folders along with their content nodes
    pub delete_media: bool,
    /// Copy files (not just sub-folders) when a content node is copied
    pub copy_media_files: bool,
    /// Track which media items each content node references
    pub move_media_files_still_in_use: bool,
    /// Node type aliases that never get a folder (case-insensitive)
    pub ignore_node_types: Vec<String>,
    pub suppression_ttl_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            rename_media: true,
            check_for_missing_relations: true,
            delete_media: true,
            copy_media_files: true,
            move_media_files_still_in_use: true,
            ignore_node_types: Vec::new(),
            suppression_ttl_secs: 30,
        }
    }
}

impl SyncSettings {
    /// Whether a content node's subtree is mirrored at all
    pub fn sync_node(&self, node: &Node) -> bool {
        !self
            .ignore_node_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&node.type_alias))
    }

    pub fn suppression_ttl(&self) -> Duration {
        Duration::from_secs(self.suppression_ttl_secs)
    }
}

pub fn default_extractor_bindings() -> BTreeMap<String, Vec<String>> {
    let mut bindings = BTreeMap::new();
    bindings.insert("MediaPicker".to_string(), vec![crate::extractor::MEDIA_PICKER.to_string()]);
    bindings.insert("RichTextEditor".to_string(), vec![crate::extractor::MARKUP.to_string()]);
    bindings
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("mediasync.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".mediasync").join("relations.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MediaSyncConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MediaSyncConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MediaSyncConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
