//! Shared error definitions used across all clockin crates.

pub mod error;

pub use error::{ClockinError, Error, FromMessage, Result};
