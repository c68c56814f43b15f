// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP client for the upstream side of the replication pipeline.
//!
//! This adapter is geometry-only: it builds read requests, validates
//! responses, and unpacks raw payloads into bit or register sequences. It
//! never interprets device data and it implements only the four read
//! functions the poller dispatches on (FC 1-4).
//!
//! Framing is done in this crate rather than through a protocol library
//! because the pipeline depends on bit-exact control of the ADU: the
//! transaction-id seed, the verbatim exception code, and the exact
//! validation order of the response header.

pub mod client;
pub mod error;
pub mod frame;

pub use client::{ModbusClient, ModbusConnector};
pub use error::{ModbusError, ModbusResult};
