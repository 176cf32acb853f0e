use anyhow::{Context, Result};
use log::debug;

use std::path::PathBuf;
use std::time::Duration;

use crate::{
    http::DEFAULT_TIMEOUT,
    registry::DEFAULT_REGISTRY_URL,
    runtime::Runtime,
    style::OutputStyle,
    verify::DEFAULT_CONCURRENCY,
};

/// Environment variable naming the program used for package search.
pub const SEARCH_COMMAND_ENV: &str = "NPH_SEARCH_COMMAND";

const DEFAULT_SEARCH_COMMAND: &str = "npm";

/// Values supplied on the command line (or through their clap env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dir: Option<PathBuf>,
    pub registry_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
}

/// Settings for one invocation, resolved once up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `package.json`
    pub dir: PathBuf,
    pub registry_url: String,
    pub timeout: Duration,
    pub concurrency: usize,
    pub search_command: String,
    pub style: OutputStyle,
}

impl Config {
    pub fn load<R: Runtime>(runtime: &R, overrides: ConfigOverrides) -> Result<Self> {
        let dir = match overrides.dir {
            Some(dir) => dir,
            None => runtime
                .current_dir()
                .context("Failed to determine the current directory")?,
        };

        let search_command = runtime
            .env_var(SEARCH_COMMAND_ENV)
            .ok()
            .filter(|cmd| !cmd.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_COMMAND.to_string());

        let config = Self {
            dir,
            registry_url: overrides
                .registry_url
                .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
            timeout: overrides
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            concurrency: overrides.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            search_command,
            style: OutputStyle::detect(runtime),
        };

        debug!("Resolved config: {:?}", config);
        Ok(config)
    }
}
