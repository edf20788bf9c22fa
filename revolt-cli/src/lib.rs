//! Revolt CLI library
//!
//! Changelog loading and the command handlers used by the `revolt` binary.

pub mod changelog;
pub mod commands;

pub use changelog::{Changelog, ChangelogError};
