//! CLI command implementations.

pub mod check;
pub mod export;
pub mod import;
pub mod list;
pub mod serve;
pub mod settings;
