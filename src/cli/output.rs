//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status lines, and formatted messages to the user.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static QUIET: AtomicBool = AtomicBool::new(false);
static JSON: AtomicBool = AtomicBool::new(false);
static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Global output settings taken from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make these settings visible to the print helpers
    pub fn apply_global(&self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
        JSON.store(self.json, Ordering::Relaxed);
        VERBOSITY.store(self.verbose, Ordering::Relaxed);
    }

    /// Log level matching `-v`/`-q`
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// Progress output is suppressed in quiet and JSON modes
fn progress_hidden() -> bool {
    is_quiet() || is_json()
}

/// Create a progress bar for downloads; the length is set once known
pub fn create_download_bar(file_name: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    if progress_hidden() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        pb.set_style(style.progress_chars("█▓▒░"));
    }
    pb.set_message(file_name.to_string());
    pb
}

pub fn print_success(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::SUCCESS);
    }
}

pub fn print_info(message: &str) {
    if !is_quiet() {
        println!("{} {message}", status::INFO);
    }
}

/// Warnings go to stderr and survive `--quiet`
pub fn print_warning(message: &str) {
    eprintln!("{} {message}", status::WARNING);
}

pub fn print_error(message: &str) {
    eprintln!("{} {message}", status::ERROR);
}

/// Indented continuation line
pub fn print_detail(message: &str) {
    if !is_quiet() {
        println!("  {message}");
    }
}

/// Print an error with its cause chain
pub fn display_error(error: &anyhow::Error) {
    if is_json() {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let json = serde_json::json!({
            "status": "error",
            "error": error.to_string(),
            "causes": causes,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return;
    }

    print_error(&error.to_string());
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";

    /// Skipped or cached prefix
    pub const SKIP: &str = "○";
}
