//! Terminal styling shared by the commands.
//!
//! Everything here writes to stderr so stdout stays clean for piping.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// Returns a `ColorfulTheme` with Vista's prompt styling.
pub fn vista_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

pub fn label() -> Style {
    Style::new().for_stderr().bold()
}

pub fn dim() -> Style {
    Style::new().for_stderr().dim()
}

pub fn warn() -> Style {
    Style::new().for_stderr().yellow()
}

pub fn error() -> Style {
    Style::new().for_stderr().red()
}

pub fn accent() -> Style {
    Style::new().for_stderr().cyan()
}

/// Print a section heading framed like the run summary.
pub fn print_heading(title: &str) {
    let rule = "=".repeat(36);
    eprintln!();
    eprintln!("  {}", accent().apply_to(&rule));
    eprintln!("  {}", accent().apply_to(format!("{title:^36}")));
    eprintln!("  {}", accent().apply_to(&rule));
}
