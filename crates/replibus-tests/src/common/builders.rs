// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration and plan builders for tests.

use std::collections::HashMap;

use replibus_config::{
    Config, FleetConfig, MemoryConfig, PollConfig, ReadConfig, SourceConfig, TargetConfig,
    UnitConfig,
};

/// Fluent builder for a [`UnitConfig`].
pub struct UnitBuilder {
    unit: UnitConfig,
}

impl UnitBuilder {
    /// Starts a unit with sensible defaults and no reads or targets.
    pub fn new(id: &str) -> Self {
        Self {
            unit: UnitConfig {
                id: id.to_string(),
                source: SourceConfig {
                    endpoint: "127.0.0.1:502".to_string(),
                    unit_id: 1,
                    timeout_ms: 500,
                    status_slot: None,
                    device_name: String::new(),
                },
                reads: Vec::new(),
                targets: Vec::new(),
                poll: PollConfig { interval_ms: 1000 },
            },
        }
    }

    /// Sets the upstream endpoint.
    pub fn source_endpoint(mut self, endpoint: &str) -> Self {
        self.unit.source.endpoint = endpoint.to_string();
        self
    }

    /// Enables the status block.
    pub fn status(mut self, slot: u16, device_name: &str) -> Self {
        self.unit.source.status_slot = Some(slot);
        self.unit.source.device_name = device_name.to_string();
        self
    }

    /// Adds a read block.
    pub fn read(mut self, fc: u8, address: u16, quantity: u16) -> Self {
        self.unit.reads.push(ReadConfig {
            fc,
            address,
            quantity,
        });
        self
    }

    /// Adds a target with one memory and one offset entry.
    pub fn target(mut self, id: u32, endpoint: &str, fc: u8, offset: u16) -> Self {
        self.unit.targets.push(TargetConfig {
            id,
            endpoint: endpoint.to_string(),
            unit_id: id as u8,
            status_unit_id: None,
            memories: vec![MemoryConfig {
                memory_id: 0,
                offsets: HashMap::from([(fc, offset)]),
            }],
        });
        self
    }

    /// Sets the status unit id on the most recently added target.
    pub fn status_unit_id(mut self, status_unit_id: u8) -> Self {
        if let Some(target) = self.unit.targets.last_mut() {
            target.status_unit_id = Some(status_unit_id);
        }
        self
    }

    /// Finishes the unit.
    pub fn build(self) -> UnitConfig {
        self.unit
    }
}

/// Wraps units into a full configuration document.
pub fn fleet(units: Vec<UnitConfig>) -> Config {
    Config {
        replicator: FleetConfig { units },
    }
}
