use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::math::MathOptions;
use crate::sanitize::Policy;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub widget: WidgetConfig,
    pub math: MathOptions,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub safe_mode: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { safe_mode: true }
    }
}

impl RenderConfig {
    pub fn policy(&self) -> Policy {
        Policy::new(self.safe_mode)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WidgetConfig {
    /// Class of the `<div>` wrapped around rendered output
    pub container_class: String,
    /// Markdown shown when a widget has no content of its own
    pub placeholder: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            container_class: "markdown-output".to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

pub const DEFAULT_PLACEHOLDER: &str = "## Hello World!\n\n\
    - This is a list item.\n\
    - **Bold text** and *italic text*.\n\n\
    [Elementor Website](https://elementor.com)";

impl Config {
    /// Load config from a TOML file, or return defaults if not found.
    ///
    /// A file that exists but does not parse is an error rather than a
    /// silent fallback.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config not found, using defaults");
                Ok(Self::compiled_default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Defaults from `default_config.toml`, checked by the build script.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }
}
