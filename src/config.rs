//! Configuration loading.
//!
//! `defaults/filterbridge.default.toml` is embedded into the library so that
//! the documented defaults and runtime behavior stay in sync. Callers layer
//! their own files and overrides on top with [`Loader`] before deserializing
//! into [`BridgeConfig`].

use crate::{FilterFlags, ThreadingModel};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/filterbridge.default.toml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub extraction: ExtractionConfig,
    pub interop: InteropConfig,
    /// Extension (lowercase, without the dot) to provider moniker.
    #[serde(default)]
    pub handlers: HashMap<String, String>,
}

/// Policy flags and buffer size for extraction passes.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub emit_text_end_markers: bool,
    pub emit_debug_trace: bool,
    pub suppress_error_if_text_found: bool,
    pub text_buffer_units: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteropConfig {
    pub threading_model: ThreadingModel,
}

impl BridgeConfig {
    /// The policy flags of the `[extraction]` section.
    pub fn filter_flags(&self) -> FilterFlags {
        FilterFlags::from(&self.extraction)
    }

    /// The configured moniker for `extension`, ignoring a leading dot and case.
    pub fn handler_for(&self, extension: &str) -> Option<&str> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.handlers.get(&ext).map(String::as_str)
    }
}

impl From<&ExtractionConfig> for FilterFlags {
    fn from(config: &ExtractionConfig) -> Self {
        FilterFlags {
            emit_text_end_markers: config.emit_text_end_markers,
            emit_debug_trace: config.emit_debug_trace,
            suppress_error_if_text_found: config.suppress_error_if_text_found,
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `extraction.emit_debug_trace`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<BridgeConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<BridgeConfig, ConfigError> {
    Loader::new().build()
}
