//! Shared error plumbing used across all moqlink crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
