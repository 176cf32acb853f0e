use anyhow::Result;
use log::{debug, info};
use thiserror::Error;

use std::future::Future;

use crate::{
    manifest::{MANIFEST_FILE, read_manifest, write_manifest},
    registry::PackageRegistry,
    runtime::Runtime,
    style::OutputStyle,
    verify::{DependencyVerifier, FixPolicy, Verification, VerificationResult, similarity},
};

use super::config::{Config, ConfigOverrides};
use super::services::build_registry;

/// Exit code used when the user interrupts a verification pass.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// The pass was cancelled before it finished; nothing was written.
#[derive(Debug, Error)]
#[error("Verification interrupted, {MANIFEST_FILE} left unchanged")]
pub struct Interrupted;

/// How a `dep` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepOutcome {
    NoDependencies,
    AllValid,
    Fixed,
    IssuesReported,
}

/// Verify the manifest's dependencies against the configured registry
#[tracing::instrument(skip(runtime, overrides))]
pub async fn dep<R: Runtime>(
    runtime: R,
    policy: FixPolicy,
    overrides: ConfigOverrides,
) -> Result<DepOutcome> {
    let config = Config::load(&runtime, overrides)?;
    let registry = build_registry(&config)?;
    run(&runtime, registry, &config, policy, tokio::signal::ctrl_c()).await
}

/// One verification pass. Resolving `interrupt` abandons the pass without
/// touching the manifest.
#[tracing::instrument(skip(runtime, registry, config, interrupt))]
pub async fn run<R, P, F>(
    runtime: &R,
    registry: P,
    config: &Config,
    policy: FixPolicy,
    interrupt: F,
) -> Result<DepOutcome>
where
    R: Runtime,
    P: PackageRegistry,
    F: Future<Output = std::io::Result<()>>,
{
    let style = config.style;
    let mut manifest = read_manifest(runtime, &config.dir)?;

    let deps = manifest.dependencies();
    if deps.is_empty() {
        println!("{}", style.warning(&format!("No dependencies found in {MANIFEST_FILE}")));
        return Ok(DepOutcome::NoDependencies);
    }

    println!("{}", style.heading(&format!("Verifying {}", manifest.path().display())));
    println!("Checking {} dependencies...", deps.len());

    let verifier = DependencyVerifier::new(registry).with_concurrency(config.concurrency);
    let verification = tokio::select! {
        biased;
        Ok(()) = interrupt => {
            println!("{}", style.warning("Operation cancelled"));
            return Err(Interrupted.into());
        }
        verification = verifier.verify(&deps, policy) => verification,
    };

    println!();
    for line in render_report(style, &verification) {
        println!("{line}");
    }
    println!();

    if !verification.has_issues() {
        println!("{}", style.success("All dependencies are valid!"));
        return Ok(DepOutcome::AllValid);
    }

    if verification.should_write() {
        manifest.replace_dependencies(&verification.fix_map);
        write_manifest(runtime, &manifest)?;
        info!("Applied {:?} to {:?}", policy, manifest.path());
        println!("{}", style.success(&format!("{MANIFEST_FILE} has been updated")));
        return Ok(DepOutcome::Fixed);
    }

    debug!("{} issue(s) left unfixed", verification.issue_count());
    for line in render_fix_hints(style) {
        println!("{line}");
    }
    Ok(DepOutcome::IssuesReported)
}

/// One block of lines per result, in result order.
pub fn render_report(style: OutputStyle, verification: &Verification) -> Vec<String> {
    let mut lines = Vec::new();
    for result in &verification.results {
        match result {
            VerificationResult::Ok(spec) => lines.push(style.success(&spec.to_string())),
            VerificationResult::VersionNotFound {
                spec,
                closest_version,
            } => {
                lines.push(style.error(&spec.to_string()));
                lines.push(style.detail(&format!(
                    "Version {} does not exist for {}",
                    spec.requested_range, spec.name
                )));
                lines.push(style.hint(&format!("Closest version available: {closest_version}")));
            }
            VerificationResult::PackageNotFound { spec, suggestion } => {
                lines.push(style.error(&spec.to_string()));
                lines.push(style.detail("This package does not exist"));
                match suggestion {
                    Some(suggestion) => {
                        let percent = (similarity(&spec.name, suggestion) * 100.0).round();
                        lines.push(style.hint(&format!(
                            "Did you mean: {suggestion} ({percent}% similar)"
                        )));
                    }
                    None => lines.push(style.detail("No similar packages found")),
                }
            }
            VerificationResult::TransientError { spec, message } => {
                lines.push(style.warning(&format!("{spec} - Error: {message}")));
            }
        }
    }
    lines
}

fn render_fix_hints(style: OutputStyle) -> Vec<String> {
    vec![
        style.warning("Some dependencies need attention"),
        style.hint(&format!("Run with {} to fix all issues", style.emphasis("--fix-all"))),
        style.hint(&format!("Run with {} to fix only versions", style.emphasis("--fix-version"))),
        style.hint(&format!("Run with {} to fix only package names", style.emphasis("--fix-name"))),
    ]
}
