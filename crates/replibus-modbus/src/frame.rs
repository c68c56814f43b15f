// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP framing: pure encode/decode, no I/O.
//!
//! A read request ADU is exactly 12 bytes:
//!
//! ```text
//! MBAP: TID(2) PID(2)=0 LEN(2)=6 UID(1)
//! PDU:  FC(1) ADDRESS(2) QUANTITY(2)
//! ```
//!
//! All integers are big-endian. Responses are validated in a fixed order:
//! transaction id, protocol id, unit id, exception bit, function code.

use crate::error::{ModbusError, ModbusResult};

/// Size of the MBAP header.
pub const MBAP_LEN: usize = 7;

/// Size of a read request ADU.
pub const READ_REQUEST_LEN: usize = 12;

/// Largest value the MBAP length field may carry (unit id + 253-byte PDU).
pub const MAX_FRAME_LEN: u16 = 254;

/// Exception flag on the response function code.
const EXCEPTION_BIT: u8 = 0x80;

// =============================================================================
// Encoding
// =============================================================================

/// Builds a read request ADU for FC 1-4.
pub fn encode_read_request(
    tid: u16,
    unit_id: u8,
    fc: u8,
    address: u16,
    quantity: u16,
) -> [u8; READ_REQUEST_LEN] {
    let mut adu = [0u8; READ_REQUEST_LEN];

    // Length = unit id (1) + PDU (1 + 2 + 2) = 6.
    adu[0..2].copy_from_slice(&tid.to_be_bytes());
    adu[2..4].copy_from_slice(&0u16.to_be_bytes());
    adu[4..6].copy_from_slice(&6u16.to_be_bytes());
    adu[6] = unit_id;

    adu[7] = fc;
    adu[8..10].copy_from_slice(&address.to_be_bytes());
    adu[10..12].copy_from_slice(&quantity.to_be_bytes());

    adu
}

// =============================================================================
// Decoding
// =============================================================================

/// Parsed MBAP header of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbap {
    /// Transaction id.
    pub transaction_id: u16,
    /// Protocol id (0 for Modbus).
    pub protocol_id: u16,
    /// Remaining frame length (unit id + PDU).
    pub length: u16,
    /// Unit id.
    pub unit_id: u8,
}

/// Parses an MBAP header and bounds-checks the declared length.
pub fn parse_mbap(header: &[u8; MBAP_LEN]) -> ModbusResult<Mbap> {
    let length = u16::from_be_bytes([header[4], header[5]]);
    if length < 2 || length > MAX_FRAME_LEN {
        return Err(ModbusError::BadFrameLength { length });
    }

    Ok(Mbap {
        transaction_id: u16::from_be_bytes([header[0], header[1]]),
        protocol_id: u16::from_be_bytes([header[2], header[3]]),
        length,
        unit_id: header[6],
    })
}

/// Validates a response against its request and returns the payload after
/// the function byte.
///
/// Checks, in order: transaction id, protocol id, unit id, exception bit,
/// function code. An exception response yields [`ModbusError::Exception`]
/// with the device's code carried verbatim.
pub fn validate_response(
    mbap: &Mbap,
    pdu: &[u8],
    expected_tid: u16,
    expected_unit: u8,
    expected_fc: u8,
) -> ModbusResult<Vec<u8>> {
    if mbap.transaction_id != expected_tid {
        return Err(ModbusError::TransactionIdMismatch {
            expected: expected_tid,
            actual: mbap.transaction_id,
        });
    }
    if mbap.protocol_id != 0 {
        return Err(ModbusError::ProtocolIdMismatch {
            actual: mbap.protocol_id,
        });
    }
    if mbap.unit_id != expected_unit {
        return Err(ModbusError::UnitIdMismatch {
            expected: expected_unit,
            actual: mbap.unit_id,
        });
    }

    let [function, payload @ ..] = pdu else {
        return Err(ModbusError::ShortPayload {
            byte_count: 1,
            available: 0,
        });
    };

    if function & EXCEPTION_BIT != 0 {
        let code = payload.first().copied().unwrap_or(0);
        return Err(ModbusError::Exception {
            function: function & !EXCEPTION_BIT,
            code,
        });
    }

    if *function != expected_fc {
        return Err(ModbusError::FunctionMismatch {
            expected: expected_fc,
            actual: *function,
        });
    }

    Ok(payload.to_vec())
}

// =============================================================================
// Payload Extraction
// =============================================================================

/// Unpacks a read-bits payload (FC 1/2) into `quantity` booleans.
///
/// `payload[0]` is the byte count; bits are packed LSB-first within each
/// byte. Positions beyond the provided bytes default to `false`.
pub fn extract_bits(payload: &[u8], quantity: u16) -> ModbusResult<Vec<bool>> {
    let [byte_count, data @ ..] = payload else {
        return Err(ModbusError::ShortPayload {
            byte_count: 1,
            available: 0,
        });
    };
    let byte_count = usize::from(*byte_count);
    if data.len() < byte_count {
        return Err(ModbusError::ShortPayload {
            byte_count,
            available: data.len(),
        });
    }
    let data = &data[..byte_count];

    let mut bits = Vec::with_capacity(usize::from(quantity));
    for i in 0..usize::from(quantity) {
        let byte = data.get(i / 8).copied().unwrap_or(0);
        bits.push(byte & (1 << (i % 8)) != 0);
    }
    Ok(bits)
}

/// Unpacks a read-registers payload (FC 3/4) into 16-bit values.
///
/// `payload[0]` is the (even) byte count; registers follow as big-endian
/// pairs.
pub fn extract_registers(payload: &[u8]) -> ModbusResult<Vec<u16>> {
    let [byte_count, data @ ..] = payload else {
        return Err(ModbusError::ShortPayload {
            byte_count: 1,
            available: 0,
        });
    };
    let byte_count = usize::from(*byte_count);
    if byte_count % 2 != 0 {
        return Err(ModbusError::OddByteCount { count: byte_count });
    }
    if data.len() < byte_count {
        return Err(ModbusError::ShortPayload {
            byte_count,
            available: data.len(),
        });
    }

    Ok(data[..byte_count]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

// =============================================================================
// Tests
// =============================================================================
