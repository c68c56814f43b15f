// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Raw Ingest v1 client for the downstream side of the replication
//! pipeline.
//!
//! Raw Ingest is a deliberately minimal write-only protocol: a 10-byte
//! header, a payload of packed bits or big-endian registers, and a single
//! status byte in reply. The transport policy is one packet per TCP
//! connection, which keeps the endpoint free of session state and makes
//! every write independently retriable by the next poll cycle.

pub mod client;
pub mod error;
pub mod packet;

pub use client::RawIngestClient;
pub use error::{IngestError, IngestResult};
