//! The `utils` module provides the shared error type and logging setup used
//! across the `countcast` crate.

pub mod error;
pub mod logging;

pub use error::TimerError;
