//! Configuration management for ssed
//!
//! ssed reads optional settings from ~/.ssed/config.toml. Every field has a
//! default, so a missing file or a missing table is never an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::executor::ExecOptions;
use crate::line_io::DEFAULT_MAX_LINE_BYTES;
use crate::pipeline::DEFAULT_HANDOFF_CAPACITY;

const MAX_CONTEXT_LINES: usize = 20;
const MAX_HANDOFF_CAPACITY: usize = 1024;
const MIN_LINE_BYTES: usize = 1024;
const MAX_LINE_BYTES_LIMIT: usize = 1024 * 1024 * 1024;
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// ssed configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Longest accepted input line in bytes
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Chunks buffered between two `then` stages
    #[serde(default = "default_handoff_capacity")]
    pub handoff_capacity: usize,

    /// Files at least this large (KiB) are memory-mapped
    #[serde(default = "default_mmap_threshold_kb")]
    pub mmap_threshold_kb: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
            handoff_capacity: default_handoff_capacity(),
            mmap_threshold_kb: default_mmap_threshold_kb(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub color: ColorMode,

    /// Unchanged lines shown around each change in `--diff` output
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::default(),
            context_lines: default_context_lines(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.ssed/ssed.log
    #[serde(default)]
    pub debug: bool,

    /// Default stderr level when SSED_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: default_level(),
        }
    }
}

// Default functions for serde
fn default_max_line_bytes() -> usize { DEFAULT_MAX_LINE_BYTES }
fn default_handoff_capacity() -> usize { DEFAULT_HANDOFF_CAPACITY }
fn default_mmap_threshold_kb() -> u64 { 1024 }
fn default_context_lines() -> usize { 3 }
fn default_level() -> String { "warn".to_string() }

impl Config {
    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            max_line_bytes: self.processing.max_line_bytes,
            handoff_capacity: self.processing.handoff_capacity,
        }
    }

    pub fn mmap_threshold_bytes(&self) -> u64 {
        self.processing.mmap_threshold_kb.saturating_mul(1024)
    }
}

/// Directory holding the config file and debug log
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".ssed"))
}

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# ssed configuration file
#
# Every setting is optional; commented values are the defaults.

[processing]
# Longest accepted input line in bytes (default: 10 MiB)
#max_line_bytes = 10485760

# Chunks of up to 64 KiB buffered between two 'then' stages (default: 4)
#handoff_capacity = 4

# Files at least this many KiB are memory-mapped instead of read (default: 1024)
#mmap_threshold_kb = 1024

[output]
# Colored diff output: "auto", "always", or "never" (default: "auto")
# NO_COLOR in the environment disables color in "auto" mode.
#color = "auto"

# Unchanged lines shown around each change with --diff (default: 3, max: 20)
#context_lines = 3

[logging]
# Also append logs to ~/.ssed/ssed.log (default: false)
#debug = false

# stderr log level when SSED_LOG is unset: error, warn, info, debug, trace
#level = "warn"
"#
}

/// Write the commented default configuration file, refusing to overwrite
pub fn save_default_config() -> Result<PathBuf> {
    let config_path = config_file_path()?;

    if config_path.exists() {
        anyhow::bail!("Config file already exists: {}", config_path.display());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    fs::write(&config_path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", config_path.display()))?;

    Ok(config_path)
}

/// Load configuration from ~/.ssed/config.toml
///
/// A missing file (or an undeterminable home directory) yields defaults.
pub fn load_config() -> Result<Config> {
    match config_file_path() {
        Ok(path) => load_config_from(&path),
        Err(_) => Ok(Config::default()),
    }
}

/// Load and validate configuration from a specific file
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&config_str)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str).context("Failed to parse TOML")?;
    validate_config(&config)?;
    Ok(config)
}

/// Render the effective configuration as TOML
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    let processing = &config.processing;

    if processing.max_line_bytes < MIN_LINE_BYTES || processing.max_line_bytes > MAX_LINE_BYTES_LIMIT {
        anyhow::bail!(
            "Invalid max_line_bytes: {} (must be {}-{})",
            processing.max_line_bytes,
            MIN_LINE_BYTES,
            MAX_LINE_BYTES_LIMIT
        );
    }

    if processing.handoff_capacity == 0 || processing.handoff_capacity > MAX_HANDOFF_CAPACITY {
        anyhow::bail!(
            "Invalid handoff_capacity: {} (must be 1-{})",
            processing.handoff_capacity,
            MAX_HANDOFF_CAPACITY
        );
    }

    if config.output.context_lines > MAX_CONTEXT_LINES {
        anyhow::bail!(
            "Invalid context_lines: {} (max {})",
            config.output.context_lines,
            MAX_CONTEXT_LINES
        );
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        anyhow::bail!(
            "Invalid log level: {} (must be one of {})",
            config.logging.level,
            LOG_LEVELS.join(", ")
        );
    }

    Ok(())
}
