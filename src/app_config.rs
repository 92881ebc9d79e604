use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::adapters::{InterlinearOptions, TypesettingOptions};
use crate::file_utils::FileManager;

/// Application configuration module
/// This module handles loading, validating and saving the renderer settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language for untagged markup text and fallback lookups
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Typesetting columns, in order; empty means every language present
    #[serde(default)]
    pub languages: Vec<String>,

    /// Interlinear alignment settings
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Rendering job settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Interlinear alignment configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AlignmentConfig {
    // @field: Source language, lowest-sorted key when unset
    #[serde(default)]
    pub source_language: Option<String>,

    // @field: Target language, every other key when unset
    #[serde(default)]
    pub target_language: Option<String>,
}

/// Rendering job configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RenderConfig {
    // @field: Directory for sources, build script and artifacts
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    // @field: Engine run twice by the build script
    #[serde(default = "default_engine")]
    pub engine: String,

    // @field: Tool override; the workspace build script when unset
    #[serde(default)]
    pub tool_path: Option<PathBuf>,

    // @field: Timeout seconds for one tool invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Extension of written sources
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            engine: default_engine(),
            tool_path: None,
            timeout_secs: default_timeout_secs(),
            source_extension: default_source_extension(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_workspace_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ldom-render")
        .join("workspace")
}

fn default_engine() -> String {
    "xelatex".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_source_extension() -> String {
    "tex".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.default_language.trim().is_empty() {
            return Err(anyhow!("Default language must not be empty"));
        }

        if self.render.timeout_secs == 0 {
            return Err(anyhow!("Render timeout must be greater than zero"));
        }

        if self.render.engine.trim().is_empty() && self.render.tool_path.is_none() {
            return Err(anyhow!("Either a typesetting engine or a tool path is required"));
        }

        // Language keys may carry dialect suffixes, so unknown codes only warn
        let configured = std::iter::once(&self.default_language)
            .chain(self.languages.iter())
            .chain(self.alignment.source_language.iter())
            .chain(self.alignment.target_language.iter());
        for code in configured {
            if !crate::language_utils::is_known_language(code) {
                warn!("Language code '{}' is not a recognized ISO code", code);
            }
        }

        Ok(())
    }

    /// Load the configuration file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path).context(format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            warn!("Config file not found at {:?}, creating default config.", path);
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        FileManager::write_to_file(path, &json)
    }

    /// Options for the typesetting adapter
    pub fn typesetting_options(&self) -> TypesettingOptions {
        TypesettingOptions {
            languages: self.languages.clone(),
        }
    }

    /// Options for the interlinear adapter
    pub fn interlinear_options(&self) -> InterlinearOptions {
        InterlinearOptions {
            source_language: self.alignment.source_language.clone(),
            target_language: self.alignment.target_language.clone(),
            default_language: self.default_language.clone(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: default_language(),
            languages: Vec::new(),
            alignment: AlignmentConfig::default(),
            render: RenderConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
