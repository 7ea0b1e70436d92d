//! Generator configuration loaded from `ait-codegen.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{GeneratorError, Result};

/// Default config file name looked up in the source directory.
pub const CONFIG_FILE_NAME: &str = "ait-codegen.toml";

/// Where `unity-bridge.ts` goes, relative to the output directory.
pub const DEFAULT_BRIDGE_FILE: &str = "../../WebGLTemplates/AITTemplate/BuildConfig~/unity-bridge.ts";

/// Top-level generator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// API names dropped right after scanning.
    pub exclude: Vec<String>,
    /// Extra or overriding API name to category mappings.
    pub categories: BTreeMap<String, String>,
    /// Category used for unmapped APIs instead of failing.
    pub fallback_category: Option<String>,
    /// Maximum depth when resolving type references.
    pub max_type_depth: usize,
    /// Create Unity `.meta` sidecars for new files.
    pub write_meta: bool,
    /// Write `unity-bridge.ts`.
    pub write_bridge: bool,
    /// Path of `unity-bridge.ts`; relative paths start at the output directory.
    pub bridge_file: PathBuf,
    /// Binding consistency tolerances.
    pub binding: BindingThresholds,
    /// Golden snapshot tolerances.
    pub golden: GoldenThresholds,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            categories: BTreeMap::new(),
            fallback_category: None,
            max_type_depth: 32,
            write_meta: true,
            write_bridge: true,
            bridge_file: PathBuf::from(DEFAULT_BRIDGE_FILE),
            binding: BindingThresholds::default(),
            golden: GoldenThresholds::default(),
        }
    }
}

/// Minimum ratios the binding checker accepts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingThresholds {
    /// Share of externs that must have a matching glue function.
    pub min_match_ratio: f64,
    /// Share of string-taking glue functions that must decode with `UTF8ToString`.
    pub min_utf8_ratio: f64,
    /// Share of void externs whose glue must reply through `SendMessage`.
    pub min_send_message_ratio: f64,
    /// Extern or glue names allowed to exist without a counterpart.
    pub allow_unpaired: Vec<String>,
}

impl Default for BindingThresholds {
    fn default() -> Self {
        Self {
            min_match_ratio: 0.9,
            min_utf8_ratio: 0.8,
            min_send_message_ratio: 0.8,
            allow_unpaired: vec!["__AITUnsubscribe_Internal".to_string()],
        }
    }
}

/// Minimum count ratio against a golden snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoldenThresholds {
    /// Generated class/enum/method counts must reach this share of the snapshot.
    pub min_count_ratio: f64,
}

impl Default for GoldenThresholds {
    fn default() -> Self {
        Self {
            min_count_ratio: 0.8,
        }
    }
}

impl GeneratorConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GeneratorError::Config(e.to_string()))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| GeneratorError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| GeneratorError::Config(format!("{}: {e}", path.display())))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `ait-codegen.toml` from a source directory if present.
    pub fn discover(source_dir: &Path) -> Result<Self> {
        Self::load(&source_dir.join(CONFIG_FILE_NAME))
    }
}
