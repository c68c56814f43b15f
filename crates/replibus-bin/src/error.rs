// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the replibus binary.

use thiserror::Error;

/// Result type alias for binary operations.
pub type BinResult<T> = Result<T, BinError>;

/// Startup and runtime errors of the daemon.
///
/// Every variant reachable during startup aborts the process with a
/// non-zero exit code; the daemon never runs on a partially built fleet.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Config(#[from] replibus_config::ConfigError),

    /// Building a unit's poller failed.
    #[error("poller build failed: {0}")]
    Poller(#[from] replibus_core::PollerError),

    /// Building a unit's write plan failed.
    #[error("writer plan failed: {0}")]
    Plan(#[from] replibus_core::PlanError),

    /// Building the upstream connector failed.
    #[error("modbus connector failed: {0}")]
    Modbus(#[from] replibus_modbus::ModbusError),

    /// Building an ingest client failed.
    #[error("ingest client failed: {0}")]
    Ingest(#[from] replibus_ingest::IngestError),

    /// Any other initialization failure.
    #[error("initialization error: {0}")]
    Initialization(String),
}

impl BinError {
    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Poller(_) | Self::Plan(_) => 2,
            Self::Modbus(_) | Self::Ingest(_) => 3,
            Self::Initialization(_) => 4,
        }
    }
}

/// Reports an error and its cause chain to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

/// Reports an error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_per_class() {
        let config: BinError =
            replibus_config::ConfigError::validation("unit.id", "must not be empty").into();
        assert_eq!(config.exit_code(), 1);

        let poller: BinError = replibus_core::PollerError::EmptyUnitId.into();
        assert_eq!(poller.exit_code(), 2);

        assert_eq!(BinError::init("boom").exit_code(), 4);
    }
}
