// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Fleet runtime orchestration.
//!
//! The runtime builds every per-unit pipeline up front - any failure aborts
//! startup - then spawns two tasks per unit (poll runner and orchestrator)
//! and blocks until a shutdown signal arrives. Units are strictly
//! independent: no state is shared between them once the configuration is
//! frozen.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use replibus_config::{load_config, normalize, validate, Config, UnitConfig};
use replibus_core::{
    DataWriter, DeviceStatusWriter, EndpointClients, Orchestrator, Plan, Poller, PollerConfig,
    ReadBlock,
};
use replibus_ingest::RawIngestClient;
use replibus_modbus::ModbusConnector;

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// Capacity of each unit's snapshot channel.
///
/// The orchestrator consumes faster than the poller produces in steady
/// state; a small buffer absorbs delivery hiccups without unbounded growth.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

// =============================================================================
// FleetRuntime
// =============================================================================

/// The running fleet.
#[derive(Debug)]
pub struct FleetRuntime {
    config: Config,
    shutdown: ShutdownCoordinator,
}

impl FleetRuntime {
    /// Loads, validates and normalizes the configuration at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> BinResult<Self> {
        let mut config = load_config(path)?;
        validate(&config)?;
        normalize(&mut config);

        Ok(Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        })
    }

    /// Builds every pipeline, spawns the per-unit tasks, and blocks until
    /// shutdown.
    pub async fn run(self) -> BinResult<()> {
        let units = &self.config.replicator.units;
        info!(
            version = replibus_core::VERSION,
            units = units.len(),
            "starting replibus fleet"
        );

        let mut handles = Vec::with_capacity(units.len() * 2);

        for unit in units {
            let (poller, orchestrator) = build_unit_pipeline(unit)?;
            let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);

            handles.push(tokio::spawn(poller.run(self.shutdown.subscribe(), tx)));
            handles.push(tokio::spawn(
                orchestrator.run(rx, self.shutdown.subscribe()),
            ));

            info!(unit = %unit.id, "unit pipeline started");
        }

        self.shutdown.wait_for_shutdown().await;

        for handle in handles {
            let _ = handle.await;
        }

        info!("replibus fleet stopped");
        Ok(())
    }
}

// =============================================================================
// Pipeline Construction
// =============================================================================

/// Builds one unit's poller and orchestrator from validated configuration.
fn build_unit_pipeline(unit: &UnitConfig) -> BinResult<(Poller, Orchestrator)> {
    let timeout = Duration::from_millis(unit.source.timeout_ms);

    // Upstream: one connector, handed to the poller as its factory.
    let connector = ModbusConnector::new(&unit.source.endpoint, unit.source.unit_id, timeout)?;
    let poller = Poller::new(
        PollerConfig {
            unit_id: unit.id.clone(),
            interval: Duration::from_millis(unit.poll.interval_ms),
            reads: unit
                .reads
                .iter()
                .map(|read| ReadBlock {
                    fc: read.fc,
                    address: read.address,
                    quantity: read.quantity,
                })
                .collect(),
        },
        Box::new(connector),
    )?;

    // Downstream: the plan, one ingest client per unique endpoint, and the
    // writers on top. Ingest connections are per-packet, so dropping the
    // clients is the whole teardown.
    let plan = Plan::build(unit)?;

    let mut clients = EndpointClients::new();
    for endpoint in plan.endpoints() {
        let client = RawIngestClient::new(endpoint.clone(), timeout)?;
        clients.insert(endpoint, Arc::new(client));
    }

    let mut status_writers = Vec::with_capacity(plan.status.len());
    for status_plan in &plan.status {
        let client = clients
            .get(&status_plan.endpoint)
            .cloned()
            .ok_or_else(|| {
                BinError::init(format!(
                    "no ingest client for status endpoint {}",
                    status_plan.endpoint
                ))
            })?;
        status_writers.push(DeviceStatusWriter::new(status_plan.clone(), client));
    }

    let data_writer = DataWriter::new(plan, clients);
    let orchestrator = Orchestrator::new(unit.id.clone(), data_writer, status_writers);

    Ok((poller, orchestrator))
}

// =============================================================================
// Tests
// =============================================================================
