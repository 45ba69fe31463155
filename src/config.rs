//! Engine configuration
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults ([`EngineConfig::default`])
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `LYNXKY__`, e.g.
//!    `LYNXKY__DEFAULT_COLUMN_WIDTH=180`
//!
//! ```toml
//! default_table = "tasks"
//! data_file = "data/lynxky.json"
//! default_column_width = 150
//! option_palette = ["gray", "blue", "green"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Runtime settings of the table engine and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Table opened when none is named.
    pub default_table: String,
    /// Store file used by the CLI.
    pub data_file: PathBuf,
    /// Width given to newly added columns.
    pub default_column_width: u32,
    /// Resize requests are clamped to this range.
    pub min_column_width: u32,
    pub max_column_width: u32,
    /// Colors handed to new select options, round-robin.
    pub option_palette: Vec<String>,
    /// Locale tag, informational for embedders picking a catalog.
    pub locale: String,
    /// Optional TOML catalog overlaid on the built-in English messages.
    pub catalog_file: Option<PathBuf>,
    /// Capacity of the event bus channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_table: "tasks".to_string(),
            data_file: PathBuf::from("data/lynxky.json"),
            default_column_width: 150,
            min_column_width: 60,
            max_column_width: 800,
            option_palette: ["gray", "brown", "orange", "yellow", "green", "blue", "purple", "pink", "red"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            locale: "en".to_string(),
            catalog_file: None,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Loads defaults, then `file` (if given and present), then the
    /// environment.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if a source cannot be parsed or a value has the
    ///   wrong type, or if the result fails [`EngineConfig::validate`]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix("LYNXKY")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("option_palette")
                .try_parsing(true),
        );

        let loaded: EngineConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;
        loaded.validate()?;
        debug!(?loaded, "Loaded engine configuration");
        Ok(loaded)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.min_column_width == 0 || self.min_column_width > self.max_column_width {
            return Err(Error::Config(format!(
                "Invalid column width bounds {}..{}",
                self.min_column_width, self.max_column_width
            )));
        }
        if self.default_column_width < self.min_column_width
            || self.default_column_width > self.max_column_width
        {
            return Err(Error::Config(format!(
                "default_column_width {} outside {}..{}",
                self.default_column_width, self.min_column_width, self.max_column_width
            )));
        }
        if self.option_palette.is_empty() {
            return Err(Error::Config("option_palette cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Clamps a requested column width to the configured bounds.
    pub fn clamp_width(&self, width: u32) -> u32 {
        width.clamp(self.min_column_width, self.max_column_width)
    }

    /// Palette color for the `index`-th option.
    pub fn palette_color(&self, index: usize) -> String {
        if self.option_palette.is_empty() {
            return "gray".to_string();
        }
        self.option_palette[index % self.option_palette.len()].clone()
    }
}
