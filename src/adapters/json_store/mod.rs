//! JSON-file persistence adapter.

pub mod store;

pub use store::{Collection, JsonStore};
