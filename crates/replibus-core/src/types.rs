// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pipeline value types.
//!
//! Everything here is geometry, not semantics: byte layout in, byte layout
//! out. The pipeline never interprets device data.

use chrono::{DateTime, Utc};

use crate::error::SourceError;

// =============================================================================
// Read Geometry
// =============================================================================

/// One Modbus read request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBlock {
    /// Function code (1, 2, 3 or 4).
    pub fc: u8,
    /// Start address.
    pub address: u16,
    /// Number of bits or registers.
    pub quantity: u16,
}

// =============================================================================
// Poll Results
// =============================================================================

/// Raw payload of a single read, shaped by the function code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockPayload {
    /// FC 1 and 2 produce bit sequences.
    Bits(Vec<bool>),
    /// FC 3 and 4 produce 16-bit register sequences.
    Registers(Vec<u16>),
}

/// Result of a single read inside a poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResult {
    /// Function code of the read.
    pub fc: u8,
    /// Start address of the read.
    pub address: u16,
    /// Requested quantity.
    pub quantity: u16,
    /// The observed values.
    pub payload: BlockPayload,
}

/// Snapshot produced by one poll cycle.
///
/// Polling is all-or-nothing: a result either carries one [`BlockResult`]
/// per configured read block (in configuration order) and no error, or an
/// error and no blocks. The constructors keep that invariant.
#[derive(Debug)]
pub struct PollResult {
    /// Unit that produced the snapshot.
    pub unit_id: String,
    /// Wall-clock time of the cycle.
    pub at: DateTime<Utc>,
    /// One entry per configured read, empty on failure.
    pub blocks: Vec<BlockResult>,
    /// Why the cycle failed, if it did.
    pub error: Option<SourceError>,
}

impl PollResult {
    /// Builds a committed snapshot.
    pub fn success(unit_id: impl Into<String>, at: DateTime<Utc>, blocks: Vec<BlockResult>) -> Self {
        Self {
            unit_id: unit_id.into(),
            at,
            blocks,
            error: None,
        }
    }

    /// Builds a failed cycle. No blocks are carried.
    pub fn failure(unit_id: impl Into<String>, at: DateTime<Utc>, error: SourceError) -> Self {
        Self {
            unit_id: unit_id.into(),
            at,
            blocks: Vec::new(),
            error: Some(error),
        }
    }

    /// Returns `true` if the cycle committed.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
