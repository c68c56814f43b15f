// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! replibus - field-device replication daemon.
//!
//! Entry point: parse arguments, initialize logging, and either validate
//! the configuration (`--check`) or run the fleet until terminated.

use clap::Parser;
use tracing::info;

use replibus_bin::cli::Cli;
use replibus_bin::error::{report_error_and_exit, BinResult};
use replibus_bin::logging::init_logging;
use replibus_bin::runtime::FleetRuntime;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(error) = run(cli).await {
        report_error_and_exit(error);
    }
}

async fn run(cli: Cli) -> BinResult<()> {
    let runtime = FleetRuntime::from_path(&cli.config)?;

    if cli.check {
        info!(path = %cli.config.display(), "configuration OK");
        return Ok(());
    }

    runtime.run().await
}
