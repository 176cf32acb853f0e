//! Environment and process information.

use anyhow::{Context, Result};
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn current_dir_impl(&self) -> Result<PathBuf> {
        env::current_dir().context("Failed to determine current directory")
    }

    pub(crate) fn is_terminal_impl(&self) -> bool {
        std::io::stdout().is_terminal()
    }
}
