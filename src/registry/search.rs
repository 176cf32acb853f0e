//! Name suggestions through the package manager's `search` command.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;
use tokio::process::Command;

/// How long the search command may run before it is killed.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Suggestions kept from a single search.
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchHit {
    name: String,
}

/// Runs `<program> [args..] search <name> --json --no-description`.
#[derive(Debug, Clone)]
pub struct NpmSearch {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl Default for NpmSearch {
    fn default() -> Self {
        Self::from_command_line("npm")
    }
}

impl NpmSearch {
    /// Parses a whitespace-separated command line such as `npm` or
    /// `sh ./fake-npm.sh`. The first word is the program.
    pub fn from_command_line(command_line: &str) -> Self {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| "npm".to_string());
        Self {
            program,
            leading_args: words.collect(),
            timeout: SEARCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns at most [`MAX_SUGGESTIONS`] names, best match first.
    ///
    /// Timeouts, spawn failures, non-zero exits and malformed output all
    /// yield an empty list.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, package_name: &str) -> Vec<String> {
        match self.run(package_name).await {
            Ok(names) => names,
            Err(e) => {
                debug!("Search for {} produced no suggestions: {:#}", package_name, e);
                Vec::new()
            }
        }
    }

    async fn run(&self, package_name: &str) -> Result<Vec<String>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(["search", package_name, "--json", "--no-description"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .with_context(|| format!("search timed out after {:?}", self.timeout))?
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            bail!("{} exited with {}", self.program, output.status);
        }

        parse_search_output(&output.stdout)
    }
}

/// Extracts the first [`MAX_SUGGESTIONS`] package names from `npm search --json`.
pub fn parse_search_output(stdout: &[u8]) -> Result<Vec<String>> {
    let hits: Vec<SearchHit> =
        serde_json::from_slice(stdout).context("malformed search output")?;
    Ok(hits
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|hit| hit.name)
        .collect())
}
