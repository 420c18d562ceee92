//! Display helpers shared by CLI commands.

pub mod format;
pub mod table;

use anyhow::Result;
use serde::Serialize;

pub use format::*;
pub use table::*;

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a success action result.
pub fn action_success(message: &str) -> String {
    format!("{} {}", console::style("\u{2713}").green().bold(), message)
}
