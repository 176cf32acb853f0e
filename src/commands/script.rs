use anyhow::{Result, bail};
use log::debug;
use thiserror::Error;

use std::collections::BTreeSet;

use crate::{
    manifest::{MANIFEST_FILE, read_manifest, write_manifest},
    runtime::Runtime,
    style::OutputStyle,
};

use super::config::Config;

/// What `nph script` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptAction {
    #[default]
    List,
    Add,
    Remove,
    Edit,
}

/// A list of script numbers that could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No valid script numbers given")]
    Empty,

    #[error("Invalid script number(s): {}", join_numbers(.0))]
    OutOfRange(Vec<usize>),
}

fn join_numbers(numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run a script subcommand against the manifest in `config.dir`
#[tracing::instrument(skip(runtime, config))]
pub fn script<R: Runtime>(runtime: &R, config: &Config, action: ScriptAction) -> Result<()> {
    match action {
        ScriptAction::List => list(runtime, config),
        ScriptAction::Add => add(runtime, config),
        ScriptAction::Remove => remove(runtime, config),
        ScriptAction::Edit => edit(runtime, config),
    }
}

/// Print every script as `name → command`
pub fn list<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let style = config.style;
    let manifest = read_manifest(runtime, &config.dir)?;
    let scripts = manifest.scripts();

    if scripts.is_empty() {
        print_no_scripts(style);
        return Ok(());
    }

    println!("{}", style.heading("Scripts"));
    let width = name_width(&scripts);
    for (name, command) in &scripts {
        println!("{}", style.script_line(name, command, width));
    }
    Ok(())
}

/// Ask for a new script and add it
pub fn add<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let style = config.style;
    let mut manifest = read_manifest(runtime, &config.dir)?;

    let name = runtime.ask("Script name")?;
    if name.is_empty() {
        bail!("Script name cannot be empty");
    }

    let command = runtime.ask("Command")?;
    if command.is_empty() {
        bail!("Script command cannot be empty");
    }

    if let Some(existing) = manifest.script(&name) {
        println!(
            "{}",
            style.warning(&format!("Script \"{name}\" already exists: {existing}"))
        );
        if !runtime.confirm("Overwrite it?")? {
            print_cancelled(style);
            return Ok(());
        }
    }

    println!("{}", style.script_line(&name, &command, name.chars().count()));
    if !runtime.confirm("Add this script?")? {
        print_cancelled(style);
        return Ok(());
    }

    manifest.set_script(&name, &command);
    write_manifest(runtime, &manifest)?;
    println!("{}", style.success(&format!("Script \"{name}\" added")));
    Ok(())
}

/// Remove one or more scripts chosen by number
pub fn remove<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let style = config.style;
    let mut manifest = read_manifest(runtime, &config.dir)?;
    let scripts = manifest.scripts();

    if scripts.is_empty() {
        print_no_scripts(style);
        return Ok(());
    }

    print_numbered(style, &scripts);
    let answer = runtime.ask("Script numbers to remove (comma-separated)")?;
    let selected = parse_selection(&answer, scripts.len())?;
    debug!("Selected script indices: {:?}", selected);

    println!("Scripts to remove:");
    for &index in &selected {
        println!("  {}", scripts[index].0);
    }

    if !runtime.confirm(&format!("Remove {} script(s)?", selected.len()))? {
        print_cancelled(style);
        return Ok(());
    }

    for &index in &selected {
        manifest.remove_script(&scripts[index].0);
    }
    write_manifest(runtime, &manifest)?;
    println!(
        "{}",
        style.success(&format!("Removed {} script(s)", selected.len()))
    );
    Ok(())
}

/// Rename a script or change its command
pub fn edit<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let style = config.style;
    let mut manifest = read_manifest(runtime, &config.dir)?;
    let scripts = manifest.scripts();

    if scripts.is_empty() {
        print_no_scripts(style);
        return Ok(());
    }

    print_numbered(style, &scripts);
    let answer = runtime.ask("Script number to edit")?;
    let index = match answer.trim().parse::<usize>() {
        Ok(number) if (1..=scripts.len()).contains(&number) => number - 1,
        _ => bail!("Invalid script number: {}", answer.trim()),
    };
    let (old_name, old_command) = &scripts[index];

    let new_name = keep_if_empty(
        runtime.ask(&format!("New name (empty keeps \"{old_name}\")"))?,
        old_name,
    );
    let new_command = keep_if_empty(
        runtime.ask(&format!("New command (empty keeps \"{old_command}\")"))?,
        old_command,
    );

    if &new_name == old_name && &new_command == old_command {
        println!("{}", style.warning("No changes made"));
        return Ok(());
    }

    if &new_name != old_name && manifest.has_script(&new_name) {
        println!(
            "{}",
            style.warning(&format!("Script \"{new_name}\" already exists and will be replaced"))
        );
    }

    let width = old_name.chars().count().max(new_name.chars().count());
    println!("{}", style.script_line(old_name, old_command, width));
    println!("{}", style.script_line(&new_name, &new_command, width));
    if !runtime.confirm("Save changes?")? {
        print_cancelled(style);
        return Ok(());
    }

    if &new_name == old_name {
        manifest.set_script(&new_name, &new_command);
    } else {
        manifest.rename_script(old_name, &new_name, &new_command);
    }
    write_manifest(runtime, &manifest)?;
    println!(
        "{}",
        style.success(&format!("Script \"{new_name}\" updated"))
    );
    Ok(())
}

/// Turns `"1, 3,x,3"` into zero-based indices `[0, 2]`.
///
/// Fragments that are not numbers are ignored. Any number outside
/// `1..=count` rejects the whole selection.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, SelectionError> {
    let numbers: BTreeSet<usize> = input
        .split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .collect();

    if numbers.is_empty() {
        return Err(SelectionError::Empty);
    }

    let invalid: Vec<usize> = numbers
        .iter()
        .copied()
        .filter(|n| !(1..=count).contains(n))
        .collect();
    if !invalid.is_empty() {
        return Err(SelectionError::OutOfRange(invalid));
    }

    Ok(numbers.into_iter().map(|n| n - 1).collect())
}

fn keep_if_empty(answer: String, current: &str) -> String {
    if answer.is_empty() {
        current.to_string()
    } else {
        answer
    }
}

fn name_width(scripts: &[(String, String)]) -> usize {
    scripts
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
}

fn print_numbered(style: OutputStyle, scripts: &[(String, String)]) {
    let width = name_width(scripts);
    for (i, (name, command)) in scripts.iter().enumerate() {
        println!("{}", style.numbered_script_line(i + 1, name, command, width));
    }
}

fn print_no_scripts(style: OutputStyle) {
    println!("{}", style.warning(&format!("No scripts found in {MANIFEST_FILE}")));
}

fn print_cancelled(style: OutputStyle) {
    println!("{}", style.warning("Operation cancelled"));
}
