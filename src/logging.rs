//! Logger setup.
//!
//! stdout carries the protocol, so records go to stderr or to a log file.

use std::fs::{File, OpenOptions};
use std::io::LineWriter;
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

use crate::config::Config;

/// Install the global logger. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(config: &Config) -> Result<()> {
    builder(config)?
        .try_init()
        .context("a logger is already installed")
}

pub fn builder(config: &Config) -> Result<Builder> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(&config.log_level));
    builder.format_timestamp_millis();

    let target = match &config.log_file {
        Some(path) => Target::Pipe(Box::new(LineWriter::new(open_log_file(path)?))),
        None => Target::Stderr,
    };
    builder.target(target);
    Ok(builder)
}

/// Open the log file, creating parent directories and dropping any
/// previous contents.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
