//! Editor configuration stored in `.pipeline-editor.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::ids::{IdGenerator, SequentialIds, UlidIds};

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".pipeline-editor.toml";

/// Editor configuration (TOML).
///
/// Missing fields default to sensible values so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub ids: IdConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Ulid,
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdConfig {
    /// How fresh step ids are generated.
    pub strategy: IdStrategy,

    /// Prefix for `sequential` ids (`<prefix>-1`, `<prefix>-2`, ...).
    pub prefix: String,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            strategy: IdStrategy::Ulid,
            prefix: "step".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON written by the editor.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ids.strategy == IdStrategy::Sequential && self.ids.prefix.trim().is_empty() {
            return Err(anyhow!("ids.prefix must be non-empty for sequential ids"));
        }
        Ok(())
    }

    /// Build the configured id generator.
    pub fn id_generator(&self) -> Box<dyn IdGenerator> {
        match self.ids.strategy {
            IdStrategy::Ulid => Box::new(UlidIds),
            IdStrategy::Sequential => Box::new(SequentialIds::new(self.ids.prefix.clone())),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EditorConfig::default()`.
pub fn load_config(path: &Path) -> Result<EditorConfig> {
    if !path.exists() {
        let cfg = EditorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EditorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EditorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
