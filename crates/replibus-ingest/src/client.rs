// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Raw Ingest v1 endpoint client.
//!
//! The client is stateless: one packet = one TCP connection. Dial, send
//! and the one-byte status read each run under the configured deadline,
//! then the connection is dropped.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use replibus_core::{DeliveryError, EndpointClient};

use crate::error::{IngestError, IngestResult};
use crate::packet::{build_packet, pack_bits, pack_registers, RESP_OK, RESP_REJECTED};

/// Default deadline when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Write client for one ingest endpoint.
#[derive(Debug, Clone)]
pub struct RawIngestClient {
    endpoint: String,
    timeout: Duration,
}

impl RawIngestClient {
    /// Creates a client for one endpoint.
    ///
    /// A zero timeout falls back to [`DEFAULT_TIMEOUT`].
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> IngestResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(IngestError::EndpointRequired);
        }
        Ok(Self {
            endpoint,
            timeout: if timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                timeout
            },
        })
    }

    /// The endpoint this client writes to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one packet and reads the single status byte.
    async fn send(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        count: u16,
        payload: &[u8],
    ) -> IngestResult<()> {
        let packet = build_packet(area, unit_id, address, count, payload);

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| self.timeout_err("dial"))?
            .map_err(|source| IngestError::Dial {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        tokio::time::timeout(self.timeout, stream.write_all(&packet))
            .await
            .map_err(|_| self.timeout_err("write"))?
            .map_err(|source| self.io_err("write", source))?;

        let mut status = [0u8; 1];
        tokio::time::timeout(self.timeout, stream.read_exact(&mut status))
            .await
            .map_err(|_| self.timeout_err("read status"))?
            .map_err(|source| self.io_err("read status", source))?;

        trace!(
            endpoint = %self.endpoint,
            area,
            unit_id,
            address,
            count,
            status = status[0],
            "ingest packet delivered"
        );

        match status[0] {
            RESP_OK => Ok(()),
            RESP_REJECTED => Err(IngestError::Rejected {
                endpoint: self.endpoint.clone(),
            }),
            other => Err(IngestError::UnknownStatus {
                endpoint: self.endpoint.clone(),
                status: other,
            }),
        }
    }

    fn timeout_err(&self, operation: &'static str) -> IngestError {
        IngestError::Timeout {
            operation,
            endpoint: self.endpoint.clone(),
            duration: self.timeout,
        }
    }

    fn io_err(&self, operation: &'static str, source: std::io::Error) -> IngestError {
        IngestError::Io {
            operation,
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

#[async_trait]
impl EndpointClient for RawIngestClient {
    async fn write_bits(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        bits: &[bool],
    ) -> Result<(), DeliveryError> {
        let payload = pack_bits(bits);
        self.send(area, unit_id, address, bits.len() as u16, &payload)
            .await
            .map_err(DeliveryError::from)
    }

    async fn write_registers(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        registers: &[u16],
    ) -> Result<(), DeliveryError> {
        let payload = pack_registers(registers);
        self.send(area, unit_id, address, registers.len() as u16, &payload)
            .await
            .map_err(DeliveryError::from)
    }
}

// =============================================================================
// Tests
// =============================================================================
