// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device status block layout and encoding.
//!
//! Every status-enabled device owns a fixed block of 20 16-bit registers in
//! the target's status memory, located at physical address
//! `base_slot * SLOTS_PER_DEVICE`:
//!
//! | Slot  | Meaning                              |
//! |-------|--------------------------------------|
//! | 0     | Health code                          |
//! | 1     | Last raw error code                  |
//! | 2     | Seconds in error (saturates at 65535)|
//! | 3-10  | Reserved (zero)                      |
//! | 11-18 | Device name, 2 ASCII chars/register  |
//! | 19    | Reserved                             |
//!
//! The layout is protocol-locked and MUST NOT be configurable. Encoding is
//! pure: no I/O, no side effects.

// =============================================================================
// Block Geometry
// =============================================================================

/// Number of registers in one device status block.
pub const SLOTS_PER_DEVICE: u16 = 20;

/// Slot of the health code.
pub const SLOT_HEALTH_CODE: u16 = 0;

/// Slot of the last raw error code.
pub const SLOT_LAST_ERROR_CODE: u16 = 1;

/// Slot of the seconds-in-error counter.
pub const SLOT_SECONDS_IN_ERROR: u16 = 2;

/// First slot of the device name. The name always sits at the end of the
/// block.
pub const SLOT_DEVICE_NAME_START: u16 = 11;

/// Number of slots reserved for the device name.
pub const SLOT_DEVICE_NAME_SLOTS: u16 = 8;

/// Maximum number of ASCII characters stored for the device name.
pub const DEVICE_NAME_MAX_CHARS: usize = 16;

/// Ceiling of the seconds-in-error counter.
pub const SECONDS_IN_ERROR_MAX: u16 = 65535;

/// Area code used for every status write (holding-register area).
pub const STATUS_AREA: u8 = 3;

// =============================================================================
// Health
// =============================================================================

/// Device health as published in slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Health {
    /// Unknown or boot state.
    Unknown = 0,
    /// Healthy device.
    Ok = 1,
    /// Device in error.
    Error = 2,
    /// Data is stale.
    Stale = 3,
    /// Device disabled.
    Disabled = 4,
}

impl Health {
    /// Wire representation of the health code.
    pub fn code(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Exactly what a status writer is allowed to deliver.
///
/// A snapshot carries no logic and no memory of the past beyond current
/// state; it is a pure value copied between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current health.
    pub health: Health,
    /// Last raw error code (0 when healthy).
    pub last_error_code: u16,
    /// Seconds spent in the current error state.
    pub seconds_in_error: u16,
}

impl Snapshot {
    /// The boot snapshot asserted before the first poll.
    pub const BOOT: Snapshot = Snapshot {
        health: Health::Unknown,
        last_error_code: 0,
        seconds_in_error: 0,
    };
}

// =============================================================================
// Encoding
// =============================================================================

/// Encodes a device name into its 8 name registers.
///
/// Characters outside printable ASCII (0x20-0x7E) become `?`; names shorter
/// than 16 characters are NUL-padded; longer names are truncated. Two
/// characters are packed per register, high byte first.
pub fn encode_device_name(name: &str) -> [u16; SLOT_DEVICE_NAME_SLOTS as usize] {
    let mut bytes = [0u8; DEVICE_NAME_MAX_CHARS];
    for (i, b) in name.bytes().take(DEVICE_NAME_MAX_CHARS).enumerate() {
        bytes[i] = if (0x20..=0x7E).contains(&b) { b } else { b'?' };
    }

    let mut regs = [0u16; SLOT_DEVICE_NAME_SLOTS as usize];
    for (i, reg) in regs.iter_mut().enumerate() {
        *reg = u16::from(bytes[2 * i]) << 8 | u16::from(bytes[2 * i + 1]);
    }
    regs
}

/// Encodes a snapshot into a full status block.
///
/// Live fields land in slots 0-2, the precomputed name registers in slots
/// 11-18, and every reserved slot is zero.
pub fn encode_block(
    snapshot: &Snapshot,
    name_regs: &[u16; SLOT_DEVICE_NAME_SLOTS as usize],
) -> [u16; SLOTS_PER_DEVICE as usize] {
    let mut regs = [0u16; SLOTS_PER_DEVICE as usize];

    regs[SLOT_HEALTH_CODE as usize] = snapshot.health.code();
    regs[SLOT_LAST_ERROR_CODE as usize] = snapshot.last_error_code;
    regs[SLOT_SECONDS_IN_ERROR as usize] = snapshot.seconds_in_error;

    let start = SLOT_DEVICE_NAME_START as usize;
    regs[start..start + SLOT_DEVICE_NAME_SLOTS as usize].copy_from_slice(name_regs);

    regs
}

// =============================================================================
// Tests
// =============================================================================
