// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Raw Ingest v1 packet building: pure byte layout, no I/O.
//!
//! The header is exactly 10 bytes and the layout is locked:
//!
//! ```text
//! 0-1  Magic "RI" (0x52 0x49)
//! 2    Version (0x01)
//! 3    Area
//! 4-5  Unit id (source is 8-bit, zero-extended)
//! 6-7  Address
//! 8-9  Count (bits or registers, not bytes)
//! 10+  Payload
//! ```
//!
//! All integers are big-endian. Bits pack LSB-first into `ceil(count / 8)`
//! bytes; registers are two big-endian bytes each.

/// First magic byte, `'R'`.
pub const MAGIC_HI: u8 = 0x52;

/// Second magic byte, `'I'`.
pub const MAGIC_LO: u8 = 0x49;

/// Protocol version.
pub const VERSION_V1: u8 = 0x01;

/// Header size in bytes.
pub const HEADER_LEN: usize = 10;

/// Status byte for an accepted packet.
pub const RESP_OK: u8 = 0x00;

/// Status byte for a rejected packet.
pub const RESP_REJECTED: u8 = 0x01;

/// Builds one framed packet.
pub fn build_packet(area: u8, unit_id: u8, address: u16, count: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());

    packet.push(MAGIC_HI);
    packet.push(MAGIC_LO);
    packet.push(VERSION_V1);
    packet.push(area);
    packet.extend_from_slice(&u16::from(unit_id).to_be_bytes());
    packet.extend_from_slice(&address.to_be_bytes());
    packet.extend_from_slice(&count.to_be_bytes());
    packet.extend_from_slice(payload);

    packet
}

/// Packs bits LSB-first into `ceil(len / 8)` bytes.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Packs registers as big-endian byte pairs.
pub fn pack_registers(registers: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(registers.len() * 2);
    for reg in registers {
        bytes.extend_from_slice(&reg.to_be_bytes());
    }
    bytes
}

// =============================================================================
// Tests
// =============================================================================
