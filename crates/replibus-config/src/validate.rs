// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pure configuration validation.
//!
//! The validator proves that a fleet's write plan is geometrically safe
//! before anything connects to the network: no two units may write
//! overlapping destination ranges for the same `(endpoint, memory, fc)`
//! triple, and no two units may own the same status slot.
//!
//! It performs declarative checks only. It MUST NOT mutate the
//! configuration and it performs no I/O; mutation belongs to
//! [`crate::normalize`].

use std::collections::{HashMap, HashSet};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{Config, UnitConfig, SUPPORTED_FUNCTION_CODES};

/// One claimed destination range, kept for overlap reporting.
struct Span {
    start: u16,
    end: u16,
    unit: String,
}

/// Validates a decoded configuration tree.
///
/// Checks, in order:
///
/// 1. per-unit shape (ids, endpoints, intervals, read geometry)
/// 2. ASCII device names
/// 3. status opt-in consistency (targets and their status unit ids)
/// 4. status-slot uniqueness per `(endpoint, status_unit_id, slot)`
/// 5. destination overlap detection per `(endpoint, memory_id, fc)`
///
/// Ranges that merely touch are permitted; sharing a single address is not.
pub fn validate(cfg: &Config) -> ConfigResult<()> {
    let mut unit_ids = HashSet::new();
    for unit in &cfg.replicator.units {
        validate_unit_shape(unit)?;
        if !unit_ids.insert(unit.id.as_str()) {
            return Err(ConfigError::DuplicateUnitId {
                unit: unit.id.clone(),
            });
        }
    }

    for unit in &cfg.replicator.units {
        validate_device_name(unit)?;
    }

    validate_status_optin(cfg)?;
    validate_status_slots(cfg)?;
    validate_destination_geometry(cfg)?;

    Ok(())
}

// =============================================================================
// Shape
// =============================================================================

fn validate_unit_shape(unit: &UnitConfig) -> ConfigResult<()> {
    if unit.id.is_empty() {
        return Err(ConfigError::validation("unit.id", "must not be empty"));
    }

    let field = |suffix: &str| format!("unit {:?}: {}", unit.id, suffix);

    if unit.source.endpoint.is_empty() {
        return Err(ConfigError::validation(
            field("source.endpoint"),
            "must not be empty",
        ));
    }
    if unit.source.timeout_ms == 0 {
        return Err(ConfigError::validation(
            field("source.timeout_ms"),
            "must be positive",
        ));
    }
    if unit.poll.interval_ms == 0 {
        return Err(ConfigError::validation(
            field("poll.interval_ms"),
            "must be positive",
        ));
    }
    if unit.reads.is_empty() {
        return Err(ConfigError::validation(
            field("reads"),
            "at least one read block is required",
        ));
    }

    for (i, read) in unit.reads.iter().enumerate() {
        if !SUPPORTED_FUNCTION_CODES.contains(&read.fc) {
            return Err(ConfigError::validation(
                field(&format!("reads[{i}].fc")),
                format!("unsupported function code {} (expected 1-4)", read.fc),
            ));
        }
        if read.quantity == 0 {
            return Err(ConfigError::validation(
                field(&format!("reads[{i}].quantity")),
                "must be at least 1",
            ));
        }
    }

    for target in &unit.targets {
        if target.endpoint.is_empty() {
            return Err(ConfigError::validation(
                field(&format!("targets[{}].endpoint", target.id)),
                "must not be empty",
            ));
        }
    }

    Ok(())
}

// =============================================================================
// Device Names
// =============================================================================

fn validate_device_name(unit: &UnitConfig) -> ConfigResult<()> {
    if unit.source.device_name.bytes().any(|b| b > 0x7F) {
        return Err(ConfigError::NonAsciiDeviceName {
            unit: unit.id.clone(),
        });
    }
    Ok(())
}

// =============================================================================
// Status Block
// =============================================================================

/// Status is opt-in per unit. Opting in requires at least one target, and
/// every target must say which status unit id it publishes under.
fn validate_status_optin(cfg: &Config) -> ConfigResult<()> {
    for unit in &cfg.replicator.units {
        if !unit.status_enabled() {
            continue;
        }

        if unit.targets.is_empty() {
            return Err(ConfigError::StatusWithoutTargets {
                unit: unit.id.clone(),
            });
        }

        for target in &unit.targets {
            if target.status_unit_id.is_none() {
                return Err(ConfigError::MissingStatusUnitId {
                    unit: unit.id.clone(),
                    target: target.id,
                });
            }
        }
    }
    Ok(())
}

/// Each `(endpoint, status_unit_id, slot)` triple may have exactly one owner.
fn validate_status_slots(cfg: &Config) -> ConfigResult<()> {
    let mut owners: HashMap<(String, u8, u16), &str> = HashMap::new();

    for unit in &cfg.replicator.units {
        let Some(slot) = unit.source.status_slot else {
            continue;
        };

        for target in &unit.targets {
            // Presence is guaranteed by validate_status_optin.
            let Some(status_unit_id) = target.status_unit_id else {
                continue;
            };

            let key = (target.endpoint.clone(), status_unit_id, slot);
            if let Some(first) = owners.get(&key) {
                return Err(ConfigError::StatusSlotCollision {
                    endpoint: target.endpoint.clone(),
                    status_unit_id,
                    slot,
                    first: (*first).to_string(),
                    second: unit.id.clone(),
                });
            }
            owners.insert(key, &unit.id);
        }
    }
    Ok(())
}

// =============================================================================
// Destination Geometry
// =============================================================================

/// For every `(unit x target x memory x read)` tuple, the destination range
/// `[offset + address, offset + address + quantity - 1]` must be disjoint
/// from every other range claimed for the same `(endpoint, memory_id, fc)`.
fn validate_destination_geometry(cfg: &Config) -> ConfigResult<()> {
    let mut spans: HashMap<(String, u16, u8), Vec<Span>> = HashMap::new();

    for unit in &cfg.replicator.units {
        for target in &unit.targets {
            for memory in &target.memories {
                for read in &unit.reads {
                    let offset = memory.offset_for(read.fc);
                    let start = offset.wrapping_add(read.address);
                    let end = start.wrapping_add(read.quantity - 1);

                    if end < start {
                        return Err(ConfigError::validation(
                            format!("unit {:?}", unit.id),
                            format!(
                                "destination range wraps the 16-bit address space \
                                 (fc={} offset={} address={} quantity={})",
                                read.fc, offset, read.address, read.quantity
                            ),
                        ));
                    }

                    let key = (target.endpoint.clone(), memory.memory_id, read.fc);
                    let existing = spans.entry(key).or_default();

                    for span in existing.iter() {
                        // Inclusive interval overlap; adjacent ranges are fine.
                        if !(end < span.start || start > span.end) {
                            return Err(ConfigError::MemoryOverlap {
                                endpoint: target.endpoint.clone(),
                                memory_id: memory.memory_id,
                                fc: read.fc,
                                unit: unit.id.clone(),
                                start,
                                end,
                                other_unit: span.unit.clone(),
                                other_start: span.start,
                                other_end: span.end,
                            });
                        }
                    }

                    existing.push(Span {
                        start,
                        end,
                        unit: unit.id.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        FleetConfig, MemoryConfig, PollConfig, ReadConfig, SourceConfig, TargetConfig, UnitConfig,
    };
    use std::collections::HashMap;

    fn unit(
        id: &str,
        endpoint: &str,
        memory_id: u16,
        fc: u8,
        addr: u16,
        qty: u16,
        offset: u16,
    ) -> UnitConfig {
        UnitConfig {
            id: id.to_string(),
            source: SourceConfig {
                endpoint: "10.0.0.1:502".to_string(),
                unit_id: 1,
                timeout_ms: 500,
                status_slot: None,
                device_name: String::new(),
            },
            reads: vec![ReadConfig {
                fc,
                address: addr,
                quantity: qty,
            }],
            targets: vec![TargetConfig {
                id: 1,
                endpoint: endpoint.to_string(),
                unit_id: 1,
                status_unit_id: None,
                memories: vec![MemoryConfig {
                    memory_id,
                    offsets: HashMap::from([(fc, offset)]),
                }],
            }],
            poll: PollConfig { interval_ms: 1000 },
        }
    }

    fn config(units: Vec<UnitConfig>) -> Config {
        Config {
            replicator: FleetConfig { units },
        }
    }

    #[test]
    fn no_overlap_on_different_endpoints() {
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u2", "ep2", 0, 3, 0, 10, 0),
        ]);
        validate(&cfg).unwrap();
    }

    #[test]
    fn no_overlap_on_different_memory() {
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u2", "ep1", 1, 3, 0, 10, 0),
        ]);
        validate(&cfg).unwrap();
    }

    #[test]
    fn no_overlap_on_different_fc() {
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u2", "ep1", 0, 4, 0, 10, 0),
        ]);
        validate(&cfg).unwrap();
    }

    #[test]
    fn touching_ranges_allowed() {
        // 0-9 next to 10-19.
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u2", "ep1", 0, 3, 10, 10, 0),
        ]);
        validate(&cfg).unwrap();
    }

    #[test]
    fn overlap_detected() {
        // 0-9 against 5-14.
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u2", "ep1", 0, 3, 5, 10, 0),
        ]);
        let err = validate(&cfg).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("u1"), "message must name the first unit: {msg}");
        assert!(msg.contains("u2"), "message must name the second unit: {msg}");
    }

    #[test]
    fn overlap_via_offset_detected() {
        // Same geometry, but unit B is shifted into unit A by its offset.
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u2", "ep1", 0, 3, 0, 10, 5),
        ]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::MemoryOverlap { .. })
        ));
    }

    #[test]
    fn overlap_within_single_unit_detected() {
        let mut u = unit("u1", "ep1", 0, 3, 0, 10, 0);
        u.reads.push(ReadConfig {
            fc: 3,
            address: 5,
            quantity: 2,
        });
        let cfg = config(vec![u]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::MemoryOverlap { .. })
        ));
    }

    #[test]
    fn range_wrapping_address_space_rejected() {
        let cfg = config(vec![unit("u1", "ep1", 0, 3, 0xFFFE, 4, 0)]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn non_ascii_device_name_rejected() {
        let mut u = unit("u1", "ep1", 0, 3, 0, 10, 0);
        u.source.device_name = "GERÄT".to_string();
        let cfg = config(vec![u]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::NonAsciiDeviceName { .. })
        ));
    }

    #[test]
    fn status_requires_targets() {
        let mut u = unit("u1", "ep1", 0, 3, 0, 10, 0);
        u.source.status_slot = Some(0);
        u.targets.clear();
        let cfg = config(vec![u]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::StatusWithoutTargets { .. })
        ));
    }

    #[test]
    fn status_requires_target_status_unit_id() {
        let mut u = unit("u1", "ep1", 0, 3, 0, 10, 0);
        u.source.status_slot = Some(0);
        let cfg = config(vec![u]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::MissingStatusUnitId { .. })
        ));
    }

    #[test]
    fn status_slot_collision_names_both_units() {
        let mut a = unit("u1", "ep1", 0, 3, 0, 10, 0);
        a.source.status_slot = Some(4);
        a.targets[0].status_unit_id = Some(9);

        let mut b = unit("u2", "ep1", 1, 3, 100, 10, 0);
        b.source.status_slot = Some(4);
        b.targets[0].status_unit_id = Some(9);

        let cfg = config(vec![a, b]);
        let err = validate(&cfg).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("u1") && msg.contains("u2"), "{msg}");
    }

    #[test]
    fn same_slot_different_status_unit_id_allowed() {
        let mut a = unit("u1", "ep1", 0, 3, 0, 10, 0);
        a.source.status_slot = Some(4);
        a.targets[0].status_unit_id = Some(9);

        let mut b = unit("u2", "ep1", 1, 3, 100, 10, 0);
        b.source.status_slot = Some(4);
        b.targets[0].status_unit_id = Some(10);

        validate(&config(vec![a, b])).unwrap();
    }

    #[test]
    fn duplicate_unit_ids_rejected() {
        let cfg = config(vec![
            unit("u1", "ep1", 0, 3, 0, 10, 0),
            unit("u1", "ep2", 0, 3, 0, 10, 0),
        ]);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::DuplicateUnitId { .. })
        ));
    }

    #[test]
    fn empty_reads_rejected() {
        let mut u = unit("u1", "ep1", 0, 3, 0, 10, 0);
        u.reads.clear();
        assert!(validate(&config(vec![u])).is_err());
    }

    #[test]
    fn bad_function_code_rejected() {
        let cfg = config(vec![unit("u1", "ep1", 0, 5, 0, 10, 0)]);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn zero_quantity_rejected() {
        let cfg = config(vec![unit("u1", "ep1", 0, 3, 0, 0, 0)]);
        assert!(validate(&cfg).is_err());
    }
}
