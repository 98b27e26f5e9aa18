//! Configuration constants
//!
//! Built-in defaults sit at the bottom of the configuration layering; the
//! global config file, environment and CLI flags override them.

pub mod defaults;
