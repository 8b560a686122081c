use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::btree::{BPlusTree, BPlusTreeError, DEFAULT_ORDER, KeyOrdering};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Tree error: {0}")]
    BPlusTreeError(#[from] BPlusTreeError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub const DEFAULT_PROMPT: &str = "leafchain> ";

fn default_order() -> usize {
    DEFAULT_ORDER
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

/// Settings for a shell session, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_order")]
    pub order: usize,

    #[serde(default)]
    pub ordering: KeyOrdering,

    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Where the REPL keeps its line history; none means no history file
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            ordering: KeyOrdering::default(),
            prompt: default_prompt(),
            history_file: None,
        }
    }
}

impl ShellConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings a tree cannot be built with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.order < 3 {
            return Err(BPlusTreeError::InvalidOrder(self.order).into());
        }
        Ok(())
    }

    /// Empty tree with the configured order and ordering
    pub fn build_tree(&self) -> ConfigResult<BPlusTree> {
        Ok(BPlusTree::with_ordering(self.order, self.ordering)?)
    }
}
