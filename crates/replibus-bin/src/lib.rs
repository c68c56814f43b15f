// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Library surface of the replibus binary.
//!
//! Everything the daemon's entry point wires together: CLI parsing,
//! logging, shutdown coordination, and the fleet runtime.

pub mod cli;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::Cli;
pub use error::{BinError, BinResult};
pub use runtime::FleetRuntime;
pub use shutdown::ShutdownCoordinator;
