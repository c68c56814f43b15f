// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The per-unit write plan.
//!
//! A plan is the frozen, validated shape of everything one unit writes
//! downstream: the target endpoints with their per-FC offset math, and the
//! status plans (one per target) when the unit publishes a device status
//! block.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use replibus_config::UnitConfig;

// =============================================================================
// Offsets
// =============================================================================

/// Per-function-code address deltas.
///
/// A fixed array indexed by FC (1..=4, slot 0 unused) instead of a map:
/// lookups are branch-free and a missing function code is naturally 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FcOffsets([u16; 5]);

impl FcOffsets {
    /// No deltas; every destination address equals the source address.
    pub const NONE: FcOffsets = FcOffsets([0; 5]);

    /// Builds offsets from a sparse configuration map.
    ///
    /// Keys outside 1..=4 are ignored.
    pub fn from_map(map: &HashMap<u8, u16>) -> Self {
        let mut offsets = [0u16; 5];
        for (&fc, &delta) in map {
            if (1..=4).contains(&fc) {
                offsets[fc as usize] = delta;
            }
        }
        Self(offsets)
    }

    /// Returns the delta for a function code (0 when absent or out of range).
    pub fn get(&self, fc: u8) -> u16 {
        if (1..=4).contains(&fc) {
            self.0[fc as usize]
        } else {
            0
        }
    }

    /// Sets the delta for a function code. Out-of-range codes are ignored.
    pub fn set(&mut self, fc: u8, delta: u16) {
        if (1..=4).contains(&fc) {
            self.0[fc as usize] = delta;
        }
    }
}

// =============================================================================
// Plan Types
// =============================================================================

/// One write destination inside a target endpoint.
#[derive(Debug, Clone, Default)]
pub struct MemoryDest {
    /// Per-FC address deltas.
    pub offsets: FcOffsets,
}

/// One target endpoint with its destinations.
#[derive(Debug, Clone)]
pub struct TargetEndpoint {
    /// Numeric target id from configuration.
    pub target_id: u32,
    /// `host:port` of the ingest endpoint.
    pub endpoint: String,
    /// Unit id stamped on data writes. Must fit one byte on the wire; the
    /// writer enforces that at delivery time.
    pub unit_id: u32,
    /// Destination memories.
    pub memories: Vec<MemoryDest>,
}

/// Where and how device status is written for one target.
#[derive(Debug, Clone)]
pub struct StatusPlan {
    /// Status endpoint (the target's own endpoint).
    pub endpoint: String,
    /// Unit id of the status block on that endpoint.
    pub unit_id: u8,
    /// Base slot; the block lives at physical address `base_slot * 20`.
    pub base_slot: u16,
    /// ASCII device name published in the block.
    pub device_name: String,
}

/// The fully-built write plan of one unit.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Owning unit id.
    pub unit_id: String,
    /// Data targets, in configuration order.
    pub targets: Vec<TargetEndpoint>,
    /// Status plans, one per target; empty when status is disabled.
    pub status: Vec<StatusPlan>,
}

/// Errors from plan construction.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The unit id was empty.
    #[error("plan: unit id required")]
    EmptyUnitId,

    /// A status-enabled unit has a target without a status unit id.
    ///
    /// Validation normally rejects this earlier; the check here keeps plan
    /// construction safe when driven directly.
    #[error("plan: unit {unit:?} target {target} has no status_unit_id")]
    MissingStatusUnitId {
        /// Owning unit id.
        unit: String,
        /// Offending target id.
        target: u32,
    },
}

impl Plan {
    /// Builds the write plan for one unit from validated configuration.
    pub fn build(unit: &UnitConfig) -> Result<Plan, PlanError> {
        if unit.id.is_empty() {
            return Err(PlanError::EmptyUnitId);
        }

        let mut plan = Plan {
            unit_id: unit.id.clone(),
            ..Plan::default()
        };

        for target in &unit.targets {
            plan.targets.push(TargetEndpoint {
                target_id: target.id,
                endpoint: target.endpoint.clone(),
                unit_id: u32::from(target.unit_id),
                memories: target
                    .memories
                    .iter()
                    .map(|memory| MemoryDest {
                        offsets: FcOffsets::from_map(&memory.offsets),
                    })
                    .collect(),
            });
        }

        // Status is opt-in; the option is checked before anything is derived
        // from it.
        if let Some(base_slot) = unit.source.status_slot {
            for target in &unit.targets {
                let Some(status_unit_id) = target.status_unit_id else {
                    return Err(PlanError::MissingStatusUnitId {
                        unit: unit.id.clone(),
                        target: target.id,
                    });
                };

                plan.status.push(StatusPlan {
                    endpoint: target.endpoint.clone(),
                    unit_id: status_unit_id,
                    base_slot,
                    device_name: unit.source.device_name.clone(),
                });
            }
        }

        Ok(plan)
    }

    /// Unique endpoints this plan writes to (data targets and status plans).
    ///
    /// One ingest client is provisioned per entry.
    pub fn endpoints(&self) -> BTreeSet<String> {
        let mut endpoints: BTreeSet<String> = self
            .targets
            .iter()
            .map(|t| t.endpoint.clone())
            .collect();
        endpoints.extend(self.status.iter().map(|s| s.endpoint.clone()));
        endpoints
    }
}

// =============================================================================
// Tests
// =============================================================================
