use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where flushed error reports are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSink {
    #[default]
    Stderr,
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Hand `include` lines to the consumer as ordinary content. When false
    /// they are skipped like blank lines.
    pub surface_include_directives: bool,
    /// Deepest include chain accepted below the root file.
    pub max_include_depth: usize,
    pub error_sink: ErrorSink,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            surface_include_directives: true,
            max_include_depth: 64,
            error_sink: ErrorSink::Stderr,
        }
    }
}

impl ParserConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no parser config, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading parser config: {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing parser config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing parser config: {}", path.display()))?;
        Ok(())
    }
}
