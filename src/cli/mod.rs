//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

use serde_json::json;

/// Report a fatal error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = json!({ "ok": false, "error": format!("{err:#}") });
        println!("{body}");
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1)
}
