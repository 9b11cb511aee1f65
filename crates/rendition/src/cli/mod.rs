//! Command implementations.

pub mod config;
pub mod get;
pub mod process;
