//! Shared error type and constants for the rotolog workspace.

pub mod constants;
pub mod error;

pub use error::{Error, Result};
