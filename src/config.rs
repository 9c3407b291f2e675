//! Engine Configuration
//!
//! Loads engine settings from a YAML file. Every field has a default, so
//! an empty file (or no file at all) yields a working configuration.
//!
//! ```yaml
//! state_dir: .ticketflow/state
//! failure_checkpoint: mark_failed   # or leave_running
//! aliases:
//!   slides: build-slides
//! catalog: catalog.yaml
//! slide_show:
//!   font_size: 28.0
//!   leader_slides: ["Welcome"]
//!   trailer_slides: ["Thank you"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::FailureCheckpoint;
use crate::slides::SlideShowConfig;

/// Directory holding ticket state when none is configured.
pub const DEFAULT_STATE_DIR: &str = ".ticketflow/state";

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}. Check that the file exists and is readable.")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}. Check the file format.")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of the disk state store.
    pub state_dir: PathBuf,

    /// What a pipeline persists when a step fails.
    pub failure_checkpoint: FailureCheckpoint,

    /// Alternate workflow names, alias to registered name.
    pub aliases: BTreeMap<String, String>,

    /// Song catalog file. The built-in sample catalog is used when unset.
    pub catalog: Option<PathBuf>,

    pub slide_show: SlideShowConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            failure_checkpoint: FailureCheckpoint::default(),
            aliases: BTreeMap::new(),
            catalog: None,
            slide_show: SlideShowConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Resolves relative paths against `base`, normally the directory of
    /// the configuration file.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.state_dir.is_relative() {
            self.state_dir = base.join(&self.state_dir);
        }
        if let Some(catalog) = self.catalog.take() {
            self.catalog = Some(if catalog.is_relative() {
                base.join(catalog)
            } else {
                catalog
            });
        }
    }
}

/// Loads an [`EngineConfig`] from a YAML file.
///
/// Relative paths in the file are resolved against the file's directory.
///
/// # Example
///
/// ```rust,no_run
/// use ticketflow::config::load_config;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_config("ticketflow.yaml")?;
///     println!("State directory: {}", config.state_dir.display());
///     Ok(())
/// }
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("YAML content loaded ({} bytes)", contents.len());

    // serde_yaml reads an empty document as null, not as an empty mapping
    let mut config: EngineConfig = if contents.trim().is_empty() {
        EngineConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    Ok(config)
}
