//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, archives and external
//! processes.

pub mod dirs;
pub mod download;
pub mod extract;
pub mod filesystem;
pub mod process;
pub mod source;
