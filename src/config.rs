//! Configuration management for the kv language server.
//!
//! Handles:
//! - Command-line argument parsing
//! - The optional `config.toml` file
//!
//! Command-line flags win over the file, which wins over built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::validation::DEFAULT_MAX_LINE_LENGTH;

/// Command-line arguments for the kv language server
#[derive(Debug, Parser)]
#[command(name = "kvls")]
#[command(about = "Language server for the Kivy kv language")]
#[command(version)]
pub struct Args {
    /// Log level for the language server
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    #[arg(long, help = "Write logs to this file instead of stderr")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Configuration file (default: <config dir>/kvls/config.toml)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Report lines at least this many characters long")]
    pub max_line_length: Option<usize>,

    #[arg(long, help = "Disable kv syntax checking")]
    pub no_syntax_check: bool,
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub lint: LintSection,
    pub syntax: SyntaxSection,
    pub log: LogSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintSection {
    pub max_line_length: Option<usize>,
    /// Rule codes that are never reported, e.g. `"KvLang102"`
    pub disabled: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxSection {
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    pub file: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub max_line_length: usize,
    pub disabled_rules: Vec<String>,
    pub syntax_check: bool,
    /// The file the settings were read from, if any
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            disabled_rules: Vec::new(),
            syntax_check: true,
            config_file: None,
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    ///
    /// An explicit `--config` must be readable. The default location is only
    /// used when the file exists.
    pub fn from_args(args: Args) -> Result<Self> {
        let (path, file) = match &args.config {
            Some(path) => (Some(path.clone()), FileConfig::load(path)?),
            None => match default_config_path().filter(|path| path.is_file()) {
                Some(path) => {
                    let file = FileConfig::load(&path)?;
                    (Some(path), file)
                }
                None => (None, FileConfig::default()),
            },
        };
        let mut config = Self::from_sources(args, file);
        config.config_file = path;
        Ok(config)
    }

    /// Merge parsed arguments over a parsed file
    pub fn from_sources(args: Args, file: FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            log_level: args.log_level,
            log_file: args.log_file.or(file.log.file),
            max_line_length: args
                .max_line_length
                .or(file.lint.max_line_length)
                .unwrap_or(defaults.max_line_length),
            disabled_rules: file.lint.disabled,
            syntax_check: !args.no_syntax_check
                && file.syntax.enabled.unwrap_or(defaults.syntax_check),
            config_file: None,
        }
    }
}

/// `<config dir>/kvls/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kvls").join("config.toml"))
}
