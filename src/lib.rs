//! Depsmith - third-party native dependency builder
//!
//! Fetches, configures, compiles and installs C/C++ libraries into a common
//! tree, in dependency order, skipping anything whose installed revision is
//! already current.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Recipes, graph resolution, revision cache and build driver
//! - [`recipes`] - Built-in recipe catalog
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod recipes;

#[cfg(test)]
pub mod test_utils;
