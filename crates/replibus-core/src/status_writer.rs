// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The device status writer.
//!
//! One writer per status plan, owned and driven exclusively by the unit's
//! orchestrator. The writer tracks what it believes the replica holds and
//! writes either the full 20-register block or single-register deltas:
//!
//! - while `need_full` is set (initially, and again after any write
//!   failure), the next call writes the entire block, re-asserting the
//!   device name and the reserved zeros;
//! - otherwise only the slots that changed since the last successful
//!   delivery are written.
//!
//! Re-assertion on doubt keeps replicas from silently diverging on slots
//! the writer believes it already delivered.

use std::sync::Arc;

use crate::error::{DeliveryError, WriteErrors};
use crate::plan::StatusPlan;
use crate::status::{
    encode_block, encode_device_name, Snapshot, SLOTS_PER_DEVICE, SLOT_DEVICE_NAME_SLOTS,
    SLOT_HEALTH_CODE, SLOT_LAST_ERROR_CODE, SLOT_SECONDS_IN_ERROR, STATUS_AREA,
};
use crate::writer::EndpointClient;

/// Delivers device status snapshots to one target's status block.
pub struct DeviceStatusWriter {
    plan: StatusPlan,
    client: Arc<dyn EndpointClient>,
    need_full: bool,
    last: Snapshot,
    name_regs: [u16; SLOT_DEVICE_NAME_SLOTS as usize],
}

impl DeviceStatusWriter {
    /// Creates a writer for one status plan.
    ///
    /// The first call to [`write_status`](Self::write_status) always writes
    /// the full block.
    pub fn new(plan: StatusPlan, client: Arc<dyn EndpointClient>) -> Self {
        let name_regs = encode_device_name(&plan.device_name);
        Self {
            plan,
            client,
            need_full: true,
            last: Snapshot::BOOT,
            name_regs,
        }
    }

    /// Physical address of slot 0 of this device's block.
    pub fn base_address(&self) -> u16 {
        self.plan.base_slot.wrapping_mul(SLOTS_PER_DEVICE)
    }

    /// The plan this writer delivers to.
    pub fn plan(&self) -> &StatusPlan {
        &self.plan
    }

    /// Delivers one snapshot.
    ///
    /// On any failure the writer keeps (or re-arms) `need_full`, so the next
    /// successful call restores the whole block bit-exact.
    pub async fn write_status(&mut self, snapshot: Snapshot) -> Result<(), WriteErrors> {
        if self.need_full {
            return self.write_full(snapshot).await;
        }
        self.write_delta(snapshot).await
    }

    async fn write_full(&mut self, snapshot: Snapshot) -> Result<(), WriteErrors> {
        let block = encode_block(&snapshot, &self.name_regs);

        match self
            .client
            .write_registers(STATUS_AREA, self.plan.unit_id, self.base_address(), &block)
            .await
        {
            Ok(()) => {
                self.need_full = false;
                self.last = snapshot;
                Ok(())
            }
            Err(source) => Err(WriteErrors::single(self.wrap(self.base_address(), source))),
        }
    }

    async fn write_delta(&mut self, snapshot: Snapshot) -> Result<(), WriteErrors> {
        let base = self.base_address();
        let mut errors = Vec::new();

        let deltas = [
            (SLOT_HEALTH_CODE, self.last.health.code(), snapshot.health.code()),
            (
                SLOT_LAST_ERROR_CODE,
                self.last.last_error_code,
                snapshot.last_error_code,
            ),
            (
                SLOT_SECONDS_IN_ERROR,
                self.last.seconds_in_error,
                snapshot.seconds_in_error,
            ),
        ];

        for (slot, previous, current) in deltas {
            if previous == current {
                continue;
            }

            let address = base.wrapping_add(slot);
            match self
                .client
                .write_registers(STATUS_AREA, self.plan.unit_id, address, &[current])
                .await
            {
                Ok(()) => match slot {
                    SLOT_HEALTH_CODE => self.last.health = snapshot.health,
                    SLOT_LAST_ERROR_CODE => self.last.last_error_code = snapshot.last_error_code,
                    _ => self.last.seconds_in_error = snapshot.seconds_in_error,
                },
                Err(source) => errors.push(self.wrap(address, source)),
            }
        }

        if !errors.is_empty() {
            // Doubt: the next successful call re-asserts the whole block.
            self.need_full = true;
        }
        WriteErrors::from_vec(errors)
    }

    fn wrap(&self, address: u16, source: DeliveryError) -> DeliveryError {
        DeliveryError::WriteFailed {
            endpoint: self.plan.endpoint.clone(),
            unit_id: self.plan.unit_id,
            fc: STATUS_AREA,
            address,
            source: Box::new(source),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
