// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core error families.
//!
//! Two kinds of failure flow through the pipeline:
//!
//! - [`SourceError`] is the upstream (poll) side. It carries enough typed
//!   information for the poller's dead-transport classifier and for the
//!   orchestrator's raw error-code extraction.
//! - [`DeliveryError`] is the downstream (ingest) side. Per-write failures
//!   are collected into a [`WriteErrors`] set and joined into one message.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// SourceError
// =============================================================================

/// Errors raised while reading from an upstream field device.
#[derive(Debug, Error)]
pub enum SourceError {
    /// TCP connect to the device failed.
    #[error("connect to {endpoint} failed: {message}")]
    Connect {
        /// Device endpoint.
        endpoint: String,
        /// Underlying failure text.
        message: String,
    },

    /// I/O failure on an established connection.
    #[error("i/o error: {message}")]
    Io {
        /// Kind reported by the operating system.
        kind: io::ErrorKind,
        /// Underlying failure text.
        message: String,
    },

    /// A dial, send or receive exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The configured per-operation deadline.
        duration: Duration,
    },

    /// The device answered with a malformed or mismatched frame.
    #[error("protocol error: {message}")]
    Protocol {
        /// What was wrong with the frame.
        message: String,
    },

    /// The device answered with a Modbus exception.
    ///
    /// The exception code is preserved verbatim end-to-end; the status
    /// block publishes it without remapping.
    #[error("modbus exception: function {function:#04x} code {code}")]
    Exception {
        /// Function code of the failed request.
        function: u8,
        /// Raw 1-byte exception code (1-11).
        code: u8,
    },

    /// A read block carries a function code the pipeline cannot dispatch.
    #[error("unsupported function code {fc}")]
    UnsupportedFunction {
        /// The offending function code.
        fc: u8,
    },

    /// No transport is available and none could be built.
    #[error("not connected")]
    NotConnected,
}

impl SourceError {
    /// Wraps an I/O error, preserving its kind for classification.
    pub fn io(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Returns the raw 16-bit error code published to the status block.
    ///
    /// Protocol exceptions expose their device-defined code; every other
    /// failure maps to the generic code `1`.
    pub fn raw_code(&self) -> u16 {
        match self {
            Self::Exception { code, .. } => u16::from(*code),
            _ => 1,
        }
    }

    /// Returns `true` for deadline expiries.
    ///
    /// Timeouts are transient by definition and never cause the poller to
    /// discard its transport.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// =============================================================================
// DeliveryError
// =============================================================================

/// Errors raised while delivering writes to an ingest endpoint.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint answered the rejected status byte (0x01).
    #[error("endpoint {endpoint} rejected the write")]
    Rejected {
        /// Rejecting endpoint.
        endpoint: String,
    },

    /// The endpoint answered a status byte outside the protocol.
    #[error("endpoint {endpoint} returned unknown status {status:#04x}")]
    UnknownStatus {
        /// Responding endpoint.
        endpoint: String,
        /// The unexpected status byte.
        status: u8,
    },

    /// Dial, send or receive failed.
    #[error("endpoint {endpoint}: {message}")]
    Io {
        /// Endpoint of the failed exchange.
        endpoint: String,
        /// Underlying failure text.
        message: String,
    },

    /// The plan references an endpoint with no provisioned client.
    #[error("no client for endpoint {endpoint}")]
    MissingClient {
        /// Unprovisioned endpoint.
        endpoint: String,
    },

    /// A target unit id does not fit the wire's single byte.
    #[error("target unit id {unit_id} out of range")]
    UnitIdOverflow {
        /// The oversized unit id.
        unit_id: u32,
    },

    /// A block carries a function code the writer cannot frame.
    #[error("unsupported function code {fc}")]
    UnsupportedFunction {
        /// The offending function code.
        fc: u8,
    },

    /// A framed write failed, with its destination attached.
    #[error("write failed endpoint={endpoint} unit={unit_id} fc={fc} addr={address}: {source}")]
    WriteFailed {
        /// Destination endpoint.
        endpoint: String,
        /// Destination unit id.
        unit_id: u8,
        /// Area / function code of the write.
        fc: u8,
        /// Destination address.
        address: u16,
        /// The underlying delivery failure.
        #[source]
        source: Box<DeliveryError>,
    },
}

// =============================================================================
// WriteErrors
// =============================================================================

/// A non-empty set of per-write failures from one delivery pass.
///
/// Displayed as the individual messages joined with `" | "`, matching the
/// status-log format consumed by fleet tooling.
#[derive(Debug)]
pub struct WriteErrors {
    errors: Vec<DeliveryError>,
}

impl std::error::Error for WriteErrors {}

impl WriteErrors {
    /// Wraps a single failure.
    pub fn single(error: DeliveryError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Converts a collected error list into a result.
    ///
    /// An empty list means the pass succeeded.
    pub fn from_vec(errors: Vec<DeliveryError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    /// The individual failures.
    pub fn errors(&self) -> &[DeliveryError] {
        &self.errors
    }
}

impl fmt::Display for WriteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.errors {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{err}")?;
            first = false;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
