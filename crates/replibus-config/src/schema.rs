// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the replication fleet.
//!
//! The schema is a direct serde mapping of the YAML document. It carries no
//! behavior beyond a few small accessors; all correctness checks live in
//! [`crate::validate`] and all mutation in [`crate::normalize`].
//!
//! # Document Shape
//!
//! ```yaml
//! replicator:
//!   units:
//!     - id: furnace-plc
//!       source:
//!         endpoint: 10.0.0.10:502
//!         unit_id: 1
//!         timeout_ms: 500
//!         status_slot: 0
//!         device_name: FURNACE-01
//!       reads:
//!         - { fc: 3, address: 0, quantity: 16 }
//!       targets:
//!         - id: 1
//!           endpoint: 10.0.1.20:1502
//!           unit_id: 1
//!           status_unit_id: 9
//!           memories:
//!             - memory_id: 0
//!               offsets: { 3: 100 }
//!       poll:
//!         interval_ms: 1000
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of ASCII characters kept for a device name.
pub const DEVICE_NAME_MAX_CHARS: usize = 16;

/// Function codes the replication pipeline understands.
pub const SUPPORTED_FUNCTION_CODES: [u8; 4] = [1, 2, 3, 4];

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// Root of the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The replication fleet.
    pub replicator: FleetConfig,
}

/// The fleet of independent replication units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// One entry per upstream field device.
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

// =============================================================================
// Unit
// =============================================================================

/// One upstream field device and its replication plan.
///
/// A unit is immutable after validation; the runtime never reloads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Unique unit identifier.
    pub id: String,

    /// Upstream device connection parameters.
    pub source: SourceConfig,

    /// Ordered read geometry; polled top to bottom every cycle.
    #[serde(default)]
    pub reads: Vec<ReadConfig>,

    /// Downstream replication targets.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    /// Poll cadence.
    pub poll: PollConfig,
}

impl UnitConfig {
    /// Returns `true` if this unit opted into the device status block.
    pub fn status_enabled(&self) -> bool {
        self.source.status_slot.is_some()
    }
}

// =============================================================================
// Source
// =============================================================================

/// Upstream Modbus TCP device parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// `host:port` of the field device.
    pub endpoint: String,

    /// Modbus unit id of the field device.
    pub unit_id: u8,

    /// Per-operation deadline in milliseconds (dial, send, receive).
    pub timeout_ms: u64,

    /// Base slot of the device status block. Status publishing is opt-in;
    /// `None` disables it for this unit.
    #[serde(default)]
    pub status_slot: Option<u16>,

    /// ASCII device name shown in the status block (truncated to
    /// [`DEVICE_NAME_MAX_CHARS`] by normalization).
    #[serde(default)]
    pub device_name: String,
}

// =============================================================================
// Read Geometry
// =============================================================================

/// One Modbus read: geometry only, no semantics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadConfig {
    /// Function code (1, 2, 3 or 4).
    pub fc: u8,

    /// Start address.
    pub address: u16,

    /// Number of bits or registers.
    pub quantity: u16,
}

// =============================================================================
// Target
// =============================================================================

/// One downstream replication target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Numeric target id (unique within the unit).
    pub id: u32,

    /// `host:port` of the ingest endpoint.
    pub endpoint: String,

    /// Unit id stamped on replicated data writes.
    pub unit_id: u8,

    /// Unit id stamped on status-block writes for this target. Required on
    /// every target of a status-enabled unit.
    #[serde(default)]
    pub status_unit_id: Option<u8>,

    /// Destination memories inside the endpoint.
    #[serde(default)]
    pub memories: Vec<MemoryConfig>,
}

/// One destination memory with its per-FC address deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Memory id inside the target endpoint.
    pub memory_id: u16,

    /// Per-function-code address delta; a missing function code means 0.
    #[serde(default)]
    pub offsets: HashMap<u8, u16>,
}

impl MemoryConfig {
    /// Returns the address delta for a function code (0 when absent).
    pub fn offset_for(&self, fc: u8) -> u16 {
        self.offsets.get(&fc).copied().unwrap_or(0)
    }
}

// =============================================================================
// Poll
// =============================================================================

/// Poll cadence for one unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Tick interval in milliseconds.
    pub interval_ms: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
replicator:
  units:
    - id: u1
      source:
        endpoint: 127.0.0.1:502
        unit_id: 1
        timeout_ms: 500
      reads:
        - { fc: 3, address: 0, quantity: 4 }
      targets:
        - id: 1
          endpoint: 127.0.0.1:1502
          unit_id: 1
          memories:
            - memory_id: 0
              offsets: { 3: 100 }
      poll:
        interval_ms: 1000
"#;

    #[test]
    fn parses_minimal_document() {
        let cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.replicator.units.len(), 1);

        let unit = &cfg.replicator.units[0];
        assert_eq!(unit.id, "u1");
        assert_eq!(unit.source.unit_id, 1);
        assert_eq!(unit.reads[0].fc, 3);
        assert_eq!(unit.targets[0].memories[0].offset_for(3), 100);
        assert_eq!(unit.targets[0].memories[0].offset_for(1), 0);
        assert!(!unit.status_enabled());
    }

    #[test]
    fn status_fields_are_optional() {
        let cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        let unit = &cfg.replicator.units[0];
        assert!(unit.source.status_slot.is_none());
        assert!(unit.targets[0].status_unit_id.is_none());
        assert_eq!(unit.source.device_name, "");
    }

    #[test]
    fn rejects_unknown_fields() {
        let doc = r#"
replicator:
  units: []
  surprise: true
"#;
        assert!(serde_yaml::from_str::<Config>(doc).is_err());
    }
}
