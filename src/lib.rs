//! Command-line front end for `wheelwright`.
//!
//! The archive work lives in `wheelwright_archive`; this crate loads
//! configuration, parses arguments, and reports results.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod info;

pub use config::Settings;
pub use error::{CliError, Result};
