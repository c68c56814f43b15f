// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core replication pipeline for replibus.
//!
//! One *unit* is one upstream field device. For every unit the daemon runs
//! the same pipeline:
//!
//! ```text
//! poller (ticker) --> PollResult --> orchestrator --> data writer  --> ingest endpoints
//!                                          |
//!                                          +--------> status writers --> ingest endpoints
//! ```
//!
//! This crate owns everything between the two wire protocols: the poller and
//! its transport-recycling policy, the write plan and its per-FC offset math,
//! the data writer, the device status state machine, and the per-unit
//! orchestrator. The Modbus TCP and Raw Ingest clients live in their own
//! crates and plug in through the [`poller::SourceClient`] and
//! [`writer::EndpointClient`] traits.

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod poller;
pub mod runner;
pub mod status;
pub mod status_writer;
pub mod types;
pub mod writer;

pub use error::{DeliveryError, SourceError, WriteErrors};
pub use orchestrator::Orchestrator;
pub use plan::{FcOffsets, MemoryDest, Plan, PlanError, StatusPlan, TargetEndpoint};
pub use poller::{Poller, PollerConfig, PollerError, SourceClient, SourceFactory};
pub use status::{Health, Snapshot};
pub use status_writer::DeviceStatusWriter;
pub use types::{BlockPayload, BlockResult, PollResult, ReadBlock};
pub use writer::{DataWriter, EndpointClient, EndpointClients};

/// Crate version, re-exported for startup banners.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
