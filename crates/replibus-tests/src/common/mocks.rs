// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Recording mocks for the pipeline traits.
//!
//! - Configurable behavior for error injection
//! - Interaction recording for verification
//! - Thread-safe so tasks and assertions can share them

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use replibus_core::{
    DeliveryError, EndpointClient, SourceClient, SourceError, SourceFactory,
};

// =============================================================================
// Mock Source
// =============================================================================

/// Scripted outcome of one upstream read.
pub enum ReadScript {
    /// Succeed with these bits (FC 1/2).
    Bits(Vec<bool>),
    /// Succeed with these registers (FC 3/4).
    Registers(Vec<u16>),
    /// Fail with this error.
    Fail(Box<dyn Fn() -> SourceError + Send + Sync>),
}

/// Shared state of a [`MockSource`] and the clients it hands out.
#[derive(Default)]
pub struct MockSourceState {
    /// Scripts consumed one per read, oldest first. When empty, reads
    /// succeed with zeroed payloads.
    pub scripts: Mutex<VecDeque<ReadScript>>,
    /// Number of factory connections handed out.
    pub connects: Mutex<u32>,
    /// Number of client close calls observed.
    pub closes: Mutex<u32>,
}

/// A [`SourceFactory`] whose clients replay scripted read outcomes.
#[derive(Clone)]
pub struct MockSource {
    state: Arc<MockSourceState>,
}

impl MockSource {
    /// Creates a source with an empty script queue.
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockSourceState::default()),
        }
    }

    /// The shared state, for scripting and assertions.
    pub fn state(&self) -> Arc<MockSourceState> {
        self.state.clone()
    }

    /// Queues one scripted read outcome.
    pub fn push(&self, script: ReadScript) {
        self.state.scripts.lock().push_back(script);
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFactory for MockSource {
    async fn connect(&self) -> Result<Box<dyn SourceClient>, SourceError> {
        *self.state.connects.lock() += 1;
        Ok(Box::new(MockSourceClient {
            state: self.state.clone(),
        }))
    }
}

struct MockSourceClient {
    state: Arc<MockSourceState>,
}

impl MockSourceClient {
    fn next_bits(&mut self, quantity: u16) -> Result<Vec<bool>, SourceError> {
        match self.state.scripts.lock().pop_front() {
            Some(ReadScript::Bits(bits)) => Ok(bits),
            Some(ReadScript::Registers(_)) => Ok(vec![false; quantity as usize]),
            Some(ReadScript::Fail(make)) => Err(make()),
            None => Ok(vec![false; quantity as usize]),
        }
    }

    fn next_registers(&mut self, quantity: u16) -> Result<Vec<u16>, SourceError> {
        match self.state.scripts.lock().pop_front() {
            Some(ReadScript::Registers(regs)) => Ok(regs),
            Some(ReadScript::Bits(_)) => Ok(vec![0; quantity as usize]),
            Some(ReadScript::Fail(make)) => Err(make()),
            None => Ok(vec![0; quantity as usize]),
        }
    }
}

#[async_trait]
impl SourceClient for MockSourceClient {
    async fn read_coils(&mut self, _address: u16, quantity: u16) -> Result<Vec<bool>, SourceError> {
        self.next_bits(quantity)
    }

    async fn read_discrete_inputs(
        &mut self,
        _address: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, SourceError> {
        self.next_bits(quantity)
    }

    async fn read_holding_registers(
        &mut self,
        _address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, SourceError> {
        self.next_registers(quantity)
    }

    async fn read_input_registers(
        &mut self,
        _address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, SourceError> {
        self.next_registers(quantity)
    }

    async fn close(&mut self) {
        *self.state.closes.lock() += 1;
    }
}

// =============================================================================
// Mock Endpoint
// =============================================================================

/// One recorded endpoint write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedWrite {
    /// A bit write.
    Bits {
        /// Area byte.
        area: u8,
        /// Destination unit id.
        unit_id: u8,
        /// Destination address.
        address: u16,
        /// The bits delivered.
        bits: Vec<bool>,
    },
    /// A register write.
    Registers {
        /// Area byte.
        area: u8,
        /// Destination unit id.
        unit_id: u8,
        /// Destination address.
        address: u16,
        /// The registers delivered.
        registers: Vec<u16>,
    },
}

/// Recording [`EndpointClient`] with per-call error injection.
#[derive(Default)]
pub struct MockEndpoint {
    /// Recorded writes, in delivery order.
    pub writes: Mutex<Vec<RecordedWrite>>,
    /// Fail this many upcoming writes.
    pub fail_next: Mutex<u32>,
}

impl MockEndpoint {
    /// Creates an endpoint that accepts everything.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next `count` writes fail with a rejection.
    pub fn fail_next(&self, count: u32) {
        *self.fail_next.lock() = count;
    }

    /// Recorded register writes only, as `(address, registers)` pairs.
    pub fn register_writes(&self) -> Vec<(u16, Vec<u16>)> {
        self.writes
            .lock()
            .iter()
            .filter_map(|write| match write {
                RecordedWrite::Registers {
                    address, registers, ..
                } => Some((*address, registers.clone())),
                RecordedWrite::Bits { .. } => None,
            })
            .collect()
    }

    fn take_failure(&self) -> bool {
        let mut fail = self.fail_next.lock();
        if *fail > 0 {
            *fail -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl EndpointClient for MockEndpoint {
    async fn write_bits(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        bits: &[bool],
    ) -> Result<(), DeliveryError> {
        if self.take_failure() {
            return Err(DeliveryError::Rejected {
                endpoint: "mock".to_string(),
            });
        }
        self.writes.lock().push(RecordedWrite::Bits {
            area,
            unit_id,
            address,
            bits: bits.to_vec(),
        });
        Ok(())
    }

    async fn write_registers(
        &self,
        area: u8,
        unit_id: u8,
        address: u16,
        registers: &[u16],
    ) -> Result<(), DeliveryError> {
        if self.take_failure() {
            return Err(DeliveryError::Rejected {
                endpoint: "mock".to_string(),
            });
        }
        self.writes.lock().push(RecordedWrite::Registers {
            area,
            unit_id,
            address,
            registers: registers.to_vec(),
        });
        Ok(())
    }
}
