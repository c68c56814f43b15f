// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The per-unit poller.
//!
//! The poller owns at most one upstream transport and performs exactly one
//! all-or-nothing read cycle per tick. It never retries inside a cycle; a
//! failed cycle surfaces through the poll result and the next tick starts
//! fresh. When a failure indicates that the underlying TCP connection is
//! dead, the transport is discarded so the next tick builds a new one
//! through the factory.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::error::SourceError;
use crate::types::{BlockPayload, BlockResult, PollResult, ReadBlock};

// =============================================================================
// Traits
// =============================================================================

/// Read operations the poller needs from an upstream device.
///
/// Geometry only: implementations build requests and unpack raw responses,
/// nothing more.
#[async_trait]
pub trait SourceClient: Send {
    /// Reads coils (FC 1).
    async fn read_coils(&mut self, address: u16, quantity: u16) -> Result<Vec<bool>, SourceError>;

    /// Reads discrete inputs (FC 2).
    async fn read_discrete_inputs(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, SourceError>;

    /// Reads holding registers (FC 3).
    async fn read_holding_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, SourceError>;

    /// Reads input registers (FC 4).
    async fn read_input_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, SourceError>;

    /// Closes the underlying connection. Best effort.
    async fn close(&mut self);
}

/// Builds a connected [`SourceClient`] on demand.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Dials the device and returns a ready client.
    async fn connect(&self) -> Result<Box<dyn SourceClient>, SourceError>;
}

// =============================================================================
// Transport
// =============================================================================

/// Connection state owned by the poller.
///
/// Mutated only from the poller task; the classifier/recycle transition is
/// explicit instead of a nilable field.
enum Transport {
    Connected(Box<dyn SourceClient>),
    Disconnected,
}

// =============================================================================
// Poller
// =============================================================================

/// Immutable runtime configuration of one poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Owning unit id.
    pub unit_id: String,
    /// Tick interval.
    pub interval: Duration,
    /// Ordered read geometry.
    pub reads: Vec<ReadBlock>,
}

/// Errors from poller construction.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The unit id was empty.
    #[error("poller: unit id required")]
    EmptyUnitId,

    /// The interval was zero.
    #[error("poller: interval must be positive")]
    NonPositiveInterval,

    /// No read blocks were configured.
    #[error("poller: at least one read block required")]
    NoReads,
}

/// Reads from one field device on a fixed cadence.
pub struct Poller {
    cfg: PollerConfig,
    transport: Transport,
    factory: Box<dyn SourceFactory>,
}

impl Poller {
    /// Creates a poller with immutable configuration.
    ///
    /// The poller starts disconnected; the factory is consulted on the
    /// first cycle.
    pub fn new(cfg: PollerConfig, factory: Box<dyn SourceFactory>) -> Result<Self, PollerError> {
        if cfg.unit_id.is_empty() {
            return Err(PollerError::EmptyUnitId);
        }
        if cfg.interval.is_zero() {
            return Err(PollerError::NonPositiveInterval);
        }
        if cfg.reads.is_empty() {
            return Err(PollerError::NoReads);
        }

        Ok(Self {
            cfg,
            transport: Transport::Disconnected,
            factory,
        })
    }

    /// The poller's configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.cfg
    }

    /// Performs exactly one poll cycle.
    ///
    /// All-or-nothing: the first read error aborts the cycle and the result
    /// carries no blocks. Reads follow configuration order. No retry happens
    /// here; factory failure simply fails the cycle and the next tick tries
    /// again.
    pub async fn poll_once(&mut self) -> PollResult {
        let at = Utc::now();

        if matches!(self.transport, Transport::Disconnected) {
            match self.factory.connect().await {
                Ok(client) => self.transport = Transport::Connected(client),
                Err(err) => return PollResult::failure(self.cfg.unit_id.as_str(), at, err),
            }
        }

        let mut blocks = Vec::with_capacity(self.cfg.reads.len());

        for i in 0..self.cfg.reads.len() {
            let read = self.cfg.reads[i];

            let Transport::Connected(client) = &mut self.transport else {
                return PollResult::failure(self.cfg.unit_id.as_str(), at, SourceError::NotConnected);
            };

            let outcome = match read.fc {
                1 => client
                    .read_coils(read.address, read.quantity)
                    .await
                    .map(BlockPayload::Bits),
                2 => client
                    .read_discrete_inputs(read.address, read.quantity)
                    .await
                    .map(BlockPayload::Bits),
                3 => client
                    .read_holding_registers(read.address, read.quantity)
                    .await
                    .map(BlockPayload::Registers),
                4 => client
                    .read_input_registers(read.address, read.quantity)
                    .await
                    .map(BlockPayload::Registers),
                fc => {
                    return PollResult::failure(
                        self.cfg.unit_id.as_str(),
                        at,
                        SourceError::UnsupportedFunction { fc },
                    )
                }
            };

            match outcome {
                Ok(payload) => blocks.push(BlockResult {
                    fc: read.fc,
                    address: read.address,
                    quantity: read.quantity,
                    payload,
                }),
                Err(err) => {
                    if is_dead_transport(&err) {
                        self.discard_transport().await;
                    }
                    return PollResult::failure(self.cfg.unit_id.as_str(), at, err);
                }
            }
        }

        // Commit only when every read succeeded.
        PollResult::success(self.cfg.unit_id.as_str(), at, blocks)
    }

    /// Closes and drops the current transport so the next cycle rebuilds it.
    async fn discard_transport(&mut self) {
        if let Transport::Connected(mut client) =
            std::mem::replace(&mut self.transport, Transport::Disconnected)
        {
            client.close().await;
        }
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        matches!(self.transport, Transport::Connected(_))
    }
}

// =============================================================================
// Dead-Transport Classification
// =============================================================================

/// Message fragments that identify a dead TCP connection across platforms.
///
/// The `wsasend` / `wsarecv` / "forcibly closed" entries cover the text
/// Windows peers produce for an aborted connection.
const DEAD_TRANSPORT_MARKERS: &[&str] = &[
    "eof",
    "broken pipe",
    "connection reset",
    "connection aborted",
    "use of closed network connection",
    "forcibly closed by the remote host",
    "wsasend",
    "wsarecv",
];

/// Conservative classifier for transport-death errors.
///
/// Timeouts are transient and never mark the transport dead. Typed I/O
/// kinds are checked first; the marker list is a fallback for errors that
/// only carry text. If this returns `true`, reusing the connection is very
/// likely to fail forever.
fn is_dead_transport(err: &SourceError) -> bool {
    if err.is_timeout() {
        return false;
    }

    if let SourceError::Io { kind, .. } = err {
        match kind {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => return true,
            _ => {}
        }
    }

    let text = err.to_string().to_lowercase();
    DEAD_TRANSPORT_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

// =============================================================================
// Tests
// =============================================================================
