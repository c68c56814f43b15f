// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The downstream data writer.
//!
//! Translates one committed poll snapshot into framed writes on the unit's
//! ingest endpoints. The writer is stateless: errors are collected per
//! write, joined, and returned; nothing is buffered or retried.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DeliveryError, WriteErrors};
use crate::plan::Plan;
use crate::types::{BlockPayload, PollResult};

// =============================================================================
// EndpointClient
// =============================================================================

/// The exact write contract the pipeline uses against an ingest endpoint.
///
/// There must be no other version of this interface anywhere; both the data
/// writer and the status writers speak through it.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    /// Writes a bit sequence (areas 1 and 2).
    async fn write_bits(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        bits: &[bool],
    ) -> Result<(), DeliveryError>;

    /// Writes a register sequence (areas 3 and 4).
    async fn write_registers(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        registers: &[u16],
    ) -> Result<(), DeliveryError>;
}

/// Endpoint clients of one unit, keyed by `host:port`.
pub type EndpointClients = HashMap<String, Arc<dyn EndpointClient>>;

// =============================================================================
// DataWriter
// =============================================================================

/// Writes poll snapshots into a unit's targets.
pub struct DataWriter {
    plan: Plan,
    clients: EndpointClients,
}

impl DataWriter {
    /// Creates a writer over a frozen plan and its provisioned clients.
    pub fn new(plan: Plan, clients: EndpointClients) -> Self {
        Self { plan, clients }
    }

    /// Delivers one poll result.
    ///
    /// A failed poll is not a writer error: the snapshot carries no blocks
    /// and the status state machine is the component that reacts. For a
    /// committed snapshot, one framed write is emitted per
    /// `target x memory x block`; the destination address is
    /// `offsets[fc] + block.address` and the area echoes the function code.
    /// Per-write failures do not stop the pass; they are joined into the
    /// returned error.
    pub async fn write(&self, result: &PollResult) -> Result<(), WriteErrors> {
        if result.error.is_some() {
            return Ok(());
        }

        let mut errors = Vec::new();

        for target in &self.plan.targets {
            let Some(client) = self.clients.get(&target.endpoint) else {
                errors.push(DeliveryError::MissingClient {
                    endpoint: target.endpoint.clone(),
                });
                continue;
            };

            let Ok(unit_id) = u8::try_from(target.unit_id) else {
                errors.push(DeliveryError::UnitIdOverflow {
                    unit_id: target.unit_id,
                });
                continue;
            };

            for memory in &target.memories {
                for block in &result.blocks {
                    let address = memory.offsets.get(block.fc).wrapping_add(block.address);

                    let outcome = match (&block.payload, block.fc) {
                        (BlockPayload::Bits(bits), 1 | 2) => {
                            client.write_bits(block.fc, unit_id, address, bits).await
                        }
                        (BlockPayload::Registers(regs), 3 | 4) => {
                            client
                                .write_registers(block.fc, unit_id, address, regs)
                                .await
                        }
                        _ => Err(DeliveryError::UnsupportedFunction { fc: block.fc }),
                    };

                    if let Err(source) = outcome {
                        errors.push(DeliveryError::WriteFailed {
                            endpoint: target.endpoint.clone(),
                            unit_id,
                            fc: block.fc,
                            address,
                            source: Box::new(source),
                        });
                    }
                }
            }
        }

        WriteErrors::from_vec(errors)
    }
}

// =============================================================================
// Tests
// =============================================================================
