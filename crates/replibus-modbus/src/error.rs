// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus client error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use replibus_core::SourceError;

/// Result type alias for Modbus operations.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors raised by the Modbus TCP client.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// No endpoint was configured.
    #[error("modbus: endpoint required")]
    EndpointRequired,

    /// TCP connect failed.
    #[error("modbus: connect to {endpoint} failed: {source}")]
    Connect {
        /// Device endpoint.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O failure on the established connection.
    #[error("modbus: i/o error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// A dial, send or receive exceeded the per-call deadline.
    #[error("modbus: {operation} timed out after {duration:?}")]
    Timeout {
        /// Which operation expired.
        operation: &'static str,
        /// The configured deadline.
        duration: Duration,
    },

    /// Response carried a different transaction id than the request.
    #[error("modbus tcp: transaction id mismatch: got {actual} want {expected}")]
    TransactionIdMismatch {
        /// Transaction id of the request.
        expected: u16,
        /// Transaction id of the response.
        actual: u16,
    },

    /// Response protocol id was not 0.
    #[error("modbus tcp: protocol id mismatch: got {actual} want 0")]
    ProtocolIdMismatch {
        /// The protocol id received.
        actual: u16,
    },

    /// Response unit id did not match the request.
    #[error("modbus tcp: unit id mismatch: got {actual} want {expected}")]
    UnitIdMismatch {
        /// Unit id of the request.
        expected: u8,
        /// Unit id of the response.
        actual: u8,
    },

    /// Response function code did not match the request.
    #[error("modbus: function mismatch: got {actual} want {expected}")]
    FunctionMismatch {
        /// Function code of the request.
        expected: u8,
        /// Function code of the response.
        actual: u8,
    },

    /// The device answered an exception response.
    ///
    /// The code is carried verbatim; downstream status publishing never
    /// remaps it.
    #[error("modbus exception: function {function:#04x} code {code}")]
    Exception {
        /// Function code the exception refers to.
        function: u8,
        /// Raw 1-byte exception code.
        code: u8,
    },

    /// The MBAP length field was outside the protocol's bounds.
    #[error("modbus tcp: frame length {length} out of range")]
    BadFrameLength {
        /// The declared length.
        length: u16,
    },

    /// A payload ended before its declared byte count.
    #[error("modbus: payload shorter than byte count: have {available}, need {byte_count}")]
    ShortPayload {
        /// Bytes the header promised.
        byte_count: usize,
        /// Bytes actually present.
        available: usize,
    },

    /// A register payload declared an odd byte count.
    #[error("modbus: register byte count not even: {count}")]
    OddByteCount {
        /// The declared byte count.
        count: usize,
    },
}

impl ModbusError {
    /// Raw 16-bit code for status publishing: the exception code when the
    /// device raised one, the generic code `1` otherwise.
    pub fn raw_code(&self) -> u16 {
        match self {
            Self::Exception { code, .. } => u16::from(*code),
            _ => 1,
        }
    }
}

impl From<ModbusError> for SourceError {
    fn from(error: ModbusError) -> Self {
        match error {
            ModbusError::Connect { endpoint, source } => SourceError::Connect {
                endpoint,
                message: source.to_string(),
            },
            ModbusError::Io { source } => SourceError::io(source),
            ModbusError::Timeout { duration, .. } => SourceError::Timeout { duration },
            ModbusError::Exception { function, code } => SourceError::Exception { function, code },
            other => SourceError::Protocol {
                message: other.to_string(),
            },
        }
    }
}
