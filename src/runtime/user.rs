//! User interaction operations (line prompts and confirmations).
//!
//! Each call locks stdin only for the duration of that prompt.

use anyhow::{Result, bail};

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Core, testable implementation of a free-form question.
/// Returns the answer with surrounding whitespace removed.
pub fn ask_with_io<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<String> {
    write!(output, "{}: ", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed before an answer was given");
    }

    Ok(line.trim().to_string())
}

/// Core, testable implementation that reads from any BufRead and writes to any Write.
pub fn confirm_with_io<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

impl RealRuntime {
    pub(crate) fn ask_impl(&self, question: &str) -> Result<String> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        ask_with_io(question, &mut stdin_lock, &mut stdout)
    }

    pub(crate) fn confirm_impl(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        confirm_with_io(prompt, &mut stdin_lock, &mut stdout)
    }
}
