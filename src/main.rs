use anyhow::Result;
use clap::Parser;
use nph::commands::{self, INTERRUPTED_EXIT_CODE, Interrupted, ScriptAction, config::ConfigOverrides};
use nph::verify::FixPolicy;
use std::path::PathBuf;

/// nph - package.json helper
///
/// Manage the scripts in package.json and check that every declared
/// dependency exists on the npm registry.
///
/// Examples:
///   nph script add        # Add a script interactively
///   nph dep               # Report missing packages and versions
///   nph dep --fix-all     # Rewrite package.json with the fixes
#[derive(Parser, Debug)]
#[command(author, about, version = env!("NPH_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing package.json (defaults to the current directory; also via NPH_DIR)
    #[arg(
        long = "dir",
        short = 'C',
        env = "NPH_DIR",
        value_name = "PATH",
        global = true
    )]
    pub dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List, add, remove or edit scripts
    Script(ScriptArgs),

    /// Verify dependency names and versions against the registry
    Dep(DepArgs),
}

#[derive(clap::Args, Debug)]
pub struct ScriptArgs {
    #[command(subcommand)]
    pub action: Option<ScriptCommand>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    /// List all scripts (default)
    List,

    /// Add a script
    Add,

    /// Remove scripts by number
    #[command(alias = "remove")]
    Rm,

    /// Rename a script or change its command
    Edit,
}

impl From<ScriptCommand> for ScriptAction {
    fn from(command: ScriptCommand) -> Self {
        match command {
            ScriptCommand::List => ScriptAction::List,
            ScriptCommand::Add => ScriptAction::Add,
            ScriptCommand::Rm => ScriptAction::Remove,
            ScriptCommand::Edit => ScriptAction::Edit,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct DepArgs {
    /// Fix both misspelled package names and missing versions
    #[arg(long)]
    pub fix_all: bool,

    /// Replace missing versions with the closest published one
    #[arg(long)]
    pub fix_version: bool,

    /// Replace missing packages with the suggested name
    #[arg(long)]
    pub fix_name: bool,

    /// Registry base URL (defaults to https://registry.npmjs.org)
    #[arg(long = "registry-url", env = "NPH_REGISTRY_URL", value_name = "URL")]
    pub registry_url: Option<String>,

    /// Network timeout in seconds (defaults to 10)
    #[arg(
        long,
        env = "NPH_TIMEOUT",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Maximum registry lookups in flight (defaults to 4)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,
}

impl DepArgs {
    fn policy(&self) -> FixPolicy {
        FixPolicy::from_flags(self.fix_all, self.fix_version, self.fix_name)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = nph::runtime::RealRuntime;

    match cli.command {
        Commands::Script(args) => {
            let action = args.action.map(ScriptAction::from).unwrap_or_default();
            let overrides = ConfigOverrides {
                dir: cli.dir,
                ..Default::default()
            };
            commands::scripts(runtime, action, overrides)?
        }
        Commands::Dep(args) => {
            let overrides = ConfigOverrides {
                dir: cli.dir,
                registry_url: args.registry_url.clone(),
                timeout_secs: args.timeout,
                concurrency: args.concurrency.map(|n| n as usize),
            };
            match commands::dep(runtime, args.policy(), overrides).await {
                Ok(_) => {}
                Err(e) if e.downcast_ref::<Interrupted>().is_some() => {
                    eprintln!("{}", e);
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}
