// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while loading or validating a fleet configuration.
///
/// Every variant is fatal at startup: the daemon refuses to run on a
/// configuration it cannot prove safe.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration document.
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A field has an invalid value.
    #[error("{field}: {reason}")]
    Validation {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Two units share the same id.
    #[error("duplicate unit id {unit:?}")]
    DuplicateUnitId {
        /// The duplicated unit id.
        unit: String,
    },

    /// A device name contains non-ASCII bytes.
    #[error("unit {unit:?}: device_name must contain ASCII characters only")]
    NonAsciiDeviceName {
        /// Owning unit id.
        unit: String,
    },

    /// A status-enabled unit declares no targets.
    #[error("unit {unit:?}: status_slot is set but the unit has no targets")]
    StatusWithoutTargets {
        /// Owning unit id.
        unit: String,
    },

    /// A target of a status-enabled unit does not declare a status unit id.
    #[error("unit {unit:?}: target {target} must declare status_unit_id because status_slot is set")]
    MissingStatusUnitId {
        /// Owning unit id.
        unit: String,
        /// Target id missing the declaration.
        target: u32,
    },

    /// Two units claim the same status slot on the same endpoint/unit pair.
    #[error(
        "status_slot collision: endpoint={endpoint} status_unit_id={status_unit_id} slot={slot} \
         used by units {first:?} and {second:?}"
    )]
    StatusSlotCollision {
        /// Status endpoint.
        endpoint: String,
        /// Status unit id on that endpoint.
        status_unit_id: u8,
        /// Colliding base slot.
        slot: u16,
        /// Unit that claimed the slot first.
        first: String,
        /// Unit that collided.
        second: String,
    },

    /// Two units write overlapping destination ranges.
    #[error(
        "memory overlap: endpoint={endpoint} memory_id={memory_id} fc={fc} \
         unit {unit:?} range {start}-{end} overlaps unit {other_unit:?} range {other_start}-{other_end}"
    )]
    MemoryOverlap {
        /// Destination endpoint.
        endpoint: String,
        /// Destination memory id.
        memory_id: u16,
        /// Function code of the colliding ranges.
        fc: u8,
        /// Unit whose range collided.
        unit: String,
        /// Start of the colliding range (inclusive).
        start: u16,
        /// End of the colliding range (inclusive).
        end: u16,
        /// Unit that registered the earlier range.
        other_unit: String,
        /// Start of the earlier range (inclusive).
        other_start: u16,
        /// End of the earlier range (inclusive).
        other_end: u16,
    },
}

impl ConfigError {
    /// Creates a generic field validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
