// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// replibus - field-device replication daemon.
///
/// Polls Modbus TCP field devices and mirrors their register and bit state
/// into downstream ingest endpoints, publishing a per-device health block
/// along the way. The daemon runs until terminated.
#[derive(Parser, Debug)]
#[command(
    name = "replibus",
    author = "Sylvex <contact@sylvex.io>",
    version = replibus_core::VERSION,
    about = "Field-device replication daemon"
)]
pub struct Cli {
    /// Path to the fleet configuration file
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "REPLIBUS_LOG_LEVEL"
    )]
    pub log_level: String,

    /// Log output format
    #[arg(long, default_value = "text", env = "REPLIBUS_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Validate the configuration and exit without starting the fleet
    #[arg(long)]
    pub check: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output (debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl Cli {
    /// The effective log level after the quiet/verbose flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
