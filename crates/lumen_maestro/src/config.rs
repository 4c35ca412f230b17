//! Configuration file loading for lumen.
//!
//! Reads `lumen.config.json` from a project directory. Every field is
//! optional; a missing file means defaults.

use std::path::Path;
use std::time::Duration;

use lumen_carton::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::document::DocumentKind;

pub const CONFIG_FILE_NAME: &str = "lumen.config.json";

/// Top-level lumen configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LumenConfig {
    /// Schema collections of content entries.
    pub collections: CollectionsConfig,

    /// Extensions (without the dot) of content entry files.
    pub content_extensions: Vec<String>,

    pub compiler: CompilerConfig,
}

impl Default for LumenConfig {
    fn default() -> Self {
        Self {
            collections: CollectionsConfig::default(),
            content_extensions: vec!["md".into(), "mdx".into(), "mdoc".into()],
            compiler: CompilerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionsConfig {
    /// Document path to collection name, e.g.
    /// `"src/content/blog/first.md": "blog"`.
    pub entries: FxHashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// How long a template compile may take before it counts as failed.
    pub timeout_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

impl LumenConfig {
    /// Content entry or component, by file extension.
    pub fn document_kind(&self, id: &str) -> DocumentKind {
        let file_name = id.rsplit(['/', '\\']).next().unwrap_or(id);
        let is_content = file_name.rsplit_once('.').is_some_and(|(_, ext)| {
            self.content_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
        if is_content {
            DocumentKind::Content
        } else {
            DocumentKind::Template
        }
    }

    /// Collection of a document. Entry paths match the whole id or a
    /// trailing path of it.
    pub fn collection_for(&self, id: &str) -> Option<&str> {
        self.collections
            .entries
            .iter()
            .find(|(path, _)| {
                id == path.as_str()
                    || id
                        .strip_suffix(path.as_str())
                        .is_some_and(|prefix| prefix.ends_with('/'))
            })
            .map(|(_, collection)| collection.as_str())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.compiler.timeout_ms)
    }
}

/// Load `lumen.config.json` from the given directory (or CWD if None).
pub fn load_config(dir: Option<&Path>) -> LumenConfig {
    let base = dir
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let config_path = base.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return LumenConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "failed to parse config");
                LumenConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %config_path.display(), error = %e, "failed to read config");
            LumenConfig::default()
        }
    }
}
