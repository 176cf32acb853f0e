//! Terminal output formatting.
//!
//! `OutputStyle` is a plain value handed to whoever prints. Rich output adds
//! ANSI colors; plain output keeps the same words and symbols without escapes.

use anstyle::{AnsiColor, Effects, Style};

use crate::runtime::Runtime;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

impl OutputStyle {
    /// Rich only when stdout is a terminal and `NO_COLOR` is unset.
    pub fn detect<R: Runtime>(runtime: &R) -> Self {
        let no_color = runtime
            .env_var("NO_COLOR")
            .is_ok_and(|value| !value.is_empty());
        resolve_output_style(runtime.is_terminal(), no_color)
    }

    pub fn success(self, message: &str) -> String {
        self.paint(success_style(), &format!("✔ {message}"))
    }

    pub fn error(self, message: &str) -> String {
        self.paint(error_style(), &format!("✘ {message}"))
    }

    pub fn warning(self, message: &str) -> String {
        self.paint(warning_style(), &format!("⚠ {message}"))
    }

    /// An indented follow-up line under a result.
    pub fn detail(self, message: &str) -> String {
        format!("  {}", self.paint(dim_style(), message))
    }

    /// An indented actionable hint, such as a suggested replacement.
    pub fn hint(self, message: &str) -> String {
        format!("  {}", self.paint(hint_style(), &format!("→ {message}")))
    }

    pub fn heading(self, title: &str) -> String {
        self.paint(heading_style(), title)
    }

    pub fn emphasis(self, text: &str) -> String {
        self.paint(emphasis_style(), text)
    }

    /// `name → command`, with the name padded to `width` columns.
    pub fn script_line(self, name: &str, command: &str, width: usize) -> String {
        let padded = format!("{name:<width$}");
        format!(
            "{} {} {}",
            self.paint(emphasis_style(), &padded),
            self.paint(dim_style(), "→"),
            command
        )
    }

    /// A numbered script line for selection prompts.
    pub fn numbered_script_line(
        self,
        number: usize,
        name: &str,
        command: &str,
        width: usize,
    ) -> String {
        format!(
            "{} {}",
            self.paint(dim_style(), &format!("{number:>3}.")),
            self.script_line(name, command, width)
        )
    }

    fn paint(self, style: Style, text: &str) -> String {
        match self {
            OutputStyle::Plain => text.to_string(),
            OutputStyle::Rich => colorize(style, text),
        }
    }
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn success_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Green.into()))
}

fn error_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Red.into()))
}

fn warning_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Yellow.into()))
}

fn hint_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Cyan.into()))
}

fn heading_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::Blue.into()))
        .effects(Effects::BOLD)
}

fn emphasis_style() -> Style {
    Style::new().effects(Effects::BOLD)
}

fn dim_style() -> Style {
    Style::new().effects(Effects::DIMMED)
}
