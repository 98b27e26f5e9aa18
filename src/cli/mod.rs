//! Argument parsing and dispatch for the `depsmith` binary
//!
//! Commands translate flags into [`crate::core`] calls and render the
//! result; nothing here touches the build tree directly.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use commands::Commands;

/// Build third-party C/C++ libraries into a shared install tree
///
/// Each library is fetched, configured, compiled and installed after the
/// libraries it links against; up-to-date installs are left alone.
#[derive(Parser, Debug)]
#[command(name = "depsmith", author, version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// More output; repeat for stage lines and debug logs
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Machine-readable output on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Dispatch to the chosen subcommand, or print help when there is none
    pub async fn run(self) -> Result<()> {
        match self.command {
            Some(command) => command.run().await,
            None => Ok(Self::command().print_help()?),
        }
    }
}
