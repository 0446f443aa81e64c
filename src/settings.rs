//! Layered configuration for the command line tool.
//!
//! `defaults/msts.default.toml` is embedded into the binary; a user file and
//! command line overrides are layered over it before deserializing into
//! [`Settings`].

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;

const DEFAULT_TOML: &str = include_str!("../defaults/msts.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log: LogSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `env_logger` filter applied when `RUST_LOG` is not set.
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

/// How a decoded file is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty `Debug` rendering of the object graph
    Debug,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start from the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file; a missing file is an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
