// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Ingest client error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use replibus_core::DeliveryError;

/// Result type alias for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while sending one ingest packet.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No endpoint was configured.
    #[error("ingest: endpoint required")]
    EndpointRequired,

    /// TCP dial failed.
    #[error("ingest: dial {endpoint} failed: {source}")]
    Dial {
        /// Target endpoint.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Sending the packet or reading the status byte failed.
    #[error("ingest: {operation} on {endpoint} failed: {source}")]
    Io {
        /// Which exchange step failed.
        operation: &'static str,
        /// Target endpoint.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The exchange exceeded the configured deadline.
    #[error("ingest: {operation} on {endpoint} timed out after {duration:?}")]
    Timeout {
        /// Which exchange step expired.
        operation: &'static str,
        /// Target endpoint.
        endpoint: String,
        /// The configured deadline.
        duration: Duration,
    },

    /// The endpoint answered the rejected status byte.
    #[error("ingest: {endpoint} rejected the packet")]
    Rejected {
        /// Rejecting endpoint.
        endpoint: String,
    },

    /// The endpoint answered a status byte outside the protocol.
    #[error("ingest: {endpoint} returned unknown status {status:#04x}")]
    UnknownStatus {
        /// Responding endpoint.
        endpoint: String,
        /// The unexpected byte.
        status: u8,
    },
}

impl From<IngestError> for DeliveryError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::Rejected { endpoint } => DeliveryError::Rejected { endpoint },
            IngestError::UnknownStatus { endpoint, status } => {
                DeliveryError::UnknownStatus { endpoint, status }
            }
            IngestError::Dial { endpoint, source } => DeliveryError::Io {
                endpoint,
                message: source.to_string(),
            },
            IngestError::Io {
                endpoint, source, ..
            } => DeliveryError::Io {
                endpoint,
                message: source.to_string(),
            },
            IngestError::Timeout {
                endpoint,
                operation,
                duration,
            } => DeliveryError::Io {
                endpoint,
                message: format!("{operation} timed out after {duration:?}"),
            },
            IngestError::EndpointRequired => DeliveryError::Io {
                endpoint: String::new(),
                message: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_to_delivery_rejected() {
        let delivery: DeliveryError = IngestError::Rejected {
            endpoint: "ep1".to_string(),
        }
        .into();
        assert!(matches!(delivery, DeliveryError::Rejected { .. }));
    }

    #[test]
    fn unknown_status_keeps_the_byte() {
        let delivery: DeliveryError = IngestError::UnknownStatus {
            endpoint: "ep1".to_string(),
            status: 0x7F,
        }
        .into();
        assert!(matches!(
            delivery,
            DeliveryError::UnknownStatus { status: 0x7F, .. }
        ));
    }
}
