// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP client over a single connection.
//!
//! One client owns one `TcpStream`. Every request/response exchange runs
//! under the configured per-call deadline; the poller decides when a failed
//! client is discarded, so the client itself never reconnects.

use std::time::Duration;

use async_trait::async_trait;
use rand::random;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use replibus_core::{SourceClient, SourceError, SourceFactory};

use crate::error::{ModbusError, ModbusResult};
use crate::frame::{
    encode_read_request, extract_bits, extract_registers, parse_mbap, validate_response, MBAP_LEN,
};

// =============================================================================
// ModbusClient
// =============================================================================

/// A connected Modbus TCP read client.
pub struct ModbusClient {
    stream: TcpStream,
    endpoint: String,
    unit_id: u8,
    timeout: Duration,
    /// Monotonically incrementing transaction id, seeded randomly so
    /// concurrent daemons against one device do not collide trivially.
    tid: u16,
}

impl ModbusClient {
    /// Dials the device and returns a ready client.
    ///
    /// The dial itself runs under the same deadline as every later call.
    pub async fn connect(endpoint: &str, unit_id: u8, timeout: Duration) -> ModbusResult<Self> {
        if endpoint.is_empty() {
            return Err(ModbusError::EndpointRequired);
        }

        let stream = tokio::time::timeout(timeout, TcpStream::connect(endpoint))
            .await
            .map_err(|_| ModbusError::Timeout {
                operation: "connect",
                duration: timeout,
            })?
            .map_err(|source| ModbusError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;

        stream.set_nodelay(true).ok();

        debug!(endpoint, unit_id, "modbus client connected");

        Ok(Self {
            stream,
            endpoint: endpoint.to_string(),
            unit_id,
            timeout,
            tid: random::<u16>(),
        })
    }

    /// The endpoint this client is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn next_tid(&mut self) -> u16 {
        self.tid = self.tid.wrapping_add(1);
        self.tid
    }

    /// One request/response exchange under the per-call deadline.
    ///
    /// Returns the validated payload after the response function byte.
    async fn round_trip(&mut self, fc: u8, address: u16, quantity: u16) -> ModbusResult<Vec<u8>> {
        let tid = self.next_tid();
        let request = encode_read_request(tid, self.unit_id, fc, address, quantity);
        let deadline = self.timeout;

        let (mbap, pdu) = tokio::time::timeout(deadline, async {
            self.stream.write_all(&request).await?;

            let mut header = [0u8; MBAP_LEN];
            self.stream.read_exact(&mut header).await?;
            let mbap = parse_mbap(&header)?;

            // Length counts the unit id already consumed with the header.
            let mut pdu = vec![0u8; usize::from(mbap.length) - 1];
            self.stream.read_exact(&mut pdu).await?;

            Ok::<_, ModbusError>((mbap, pdu))
        })
        .await
        .map_err(|_| ModbusError::Timeout {
            operation: "read",
            duration: deadline,
        })??;

        validate_response(&mbap, &pdu, tid, self.unit_id, fc)
    }

    async fn read_bits(&mut self, fc: u8, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        if quantity == 0 {
            return Ok(Vec::new());
        }
        let payload = self.round_trip(fc, address, quantity).await?;
        extract_bits(&payload, quantity)
    }

    async fn read_registers(
        &mut self,
        fc: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        if quantity == 0 {
            return Ok(Vec::new());
        }
        let payload = self.round_trip(fc, address, quantity).await?;
        extract_registers(&payload)
    }
}

#[async_trait]
impl SourceClient for ModbusClient {
    async fn read_coils(&mut self, address: u16, quantity: u16) -> Result<Vec<bool>, SourceError> {
        self.read_bits(1, address, quantity)
            .await
            .map_err(SourceError::from)
    }

    async fn read_discrete_inputs(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, SourceError> {
        self.read_bits(2, address, quantity)
            .await
            .map_err(SourceError::from)
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, SourceError> {
        self.read_registers(3, address, quantity)
            .await
            .map_err(SourceError::from)
    }

    async fn read_input_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, SourceError> {
        self.read_registers(4, address, quantity)
            .await
            .map_err(SourceError::from)
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

// =============================================================================
// ModbusConnector
// =============================================================================

/// Factory that dials one upstream device on demand.
///
/// The poller asks for a new client whenever its transport was discarded.
#[derive(Debug, Clone)]
pub struct ModbusConnector {
    endpoint: String,
    unit_id: u8,
    timeout: Duration,
}

impl ModbusConnector {
    /// Creates a connector for one device.
    pub fn new(
        endpoint: impl Into<String>,
        unit_id: u8,
        timeout: Duration,
    ) -> ModbusResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(ModbusError::EndpointRequired);
        }
        Ok(Self {
            endpoint,
            unit_id,
            timeout,
        })
    }
}

#[async_trait]
impl SourceFactory for ModbusConnector {
    async fn connect(&self) -> Result<Box<dyn SourceClient>, SourceError> {
        let client = ModbusClient::connect(&self.endpoint, self.unit_id, self.timeout)
            .await
            .map_err(SourceError::from)?;
        Ok(Box::new(client))
    }
}

// =============================================================================
// Tests
// =============================================================================
