//! Core build logic
//!
//! Recipes, the dependency graph, the revision cache and the driver that
//! walks them. Tool invocation, downloads and archive handling live in
//! [`crate::infra`] behind traits so everything here can be tested without
//! a network or a compiler.
//!
//! # Submodules
//!
//! - [`build_env`] - Platform, build mode, link mode and the derived tree layout
//! - [`recipe`] - The recipe contract, per-recipe paths and the catalog
//! - [`resolver`] - Dependency graph resolution and build order
//! - [`revision_cache`] - Persisted record of installed revisions
//! - [`builder`] - Stage pipeline and build driver
//! - [`plan`] - Dry-run preview of a build
//! - [`clean`] - Removal of build and install directories
//! - [`doctor`] - External tool checks
//! - [`global_config`] - User configuration and environment layering

pub mod build_env;
pub mod builder;
pub mod clean;
pub mod doctor;
pub mod global_config;
pub mod plan;
pub mod recipe;
pub mod resolver;
pub mod revision_cache;
