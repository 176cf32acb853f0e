pub mod config;
mod dep;
mod script;
mod services;

pub use dep::{DepOutcome, INTERRUPTED_EXIT_CODE, Interrupted, dep, render_report, run as run_dep};
pub use script::{ScriptAction, SelectionError, parse_selection, script};
pub use services::{build_http_client, build_registry, build_search};

use anyhow::Result;

use crate::runtime::Runtime;

use config::{Config, ConfigOverrides};

/// Load configuration and run a script subcommand
#[tracing::instrument(skip(runtime, overrides))]
pub fn scripts<R: Runtime>(runtime: R, action: ScriptAction, overrides: ConfigOverrides) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    script(&runtime, &config, action)
}
