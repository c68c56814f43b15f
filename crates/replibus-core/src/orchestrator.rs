// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The per-unit orchestrator.
//!
//! A single task per unit coordinates three event sources: poll snapshots
//! from the runner, the 1 Hz seconds clock, and shutdown. The orchestrator
//! is the sole owner of the in-memory status snapshot and of every status
//! writer, which makes snapshot handling and the seconds tick race-free
//! without locks. One event is processed to completion before the next.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::status::{Health, Snapshot, SECONDS_IN_ERROR_MAX};
use crate::status_writer::DeviceStatusWriter;
use crate::types::PollResult;
use crate::writer::DataWriter;

/// Drives one unit's data delivery and status publishing.
pub struct Orchestrator {
    unit_id: String,
    data_writer: DataWriter,
    status_writers: Vec<DeviceStatusWriter>,
    snapshot: Snapshot,
}

impl Orchestrator {
    /// Creates the orchestrator for one unit.
    ///
    /// `status_writers` is empty for units that did not opt into the status
    /// block; every status path is then a no-op.
    pub fn new(
        unit_id: impl Into<String>,
        data_writer: DataWriter,
        status_writers: Vec<DeviceStatusWriter>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            data_writer,
            status_writers,
            snapshot: Snapshot::BOOT,
        }
    }

    /// Runs until shutdown or until the snapshot channel closes.
    ///
    /// Immediately asserts identity (the full status block, device name
    /// included) on every status writer before entering the loop.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<PollResult>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(unit = %self.unit_id, "orchestrator started");

        self.broadcast_status().await;

        let second = Duration::from_secs(1);
        let mut seconds_clock =
            tokio::time::interval_at(tokio::time::Instant::now() + second, second);
        seconds_clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(unit = %self.unit_id, "orchestrator stopping");
                    return;
                }
                received = rx.recv() => {
                    match received {
                        Some(result) => self.handle_poll_result(result).await,
                        None => {
                            debug!(unit = %self.unit_id, "snapshot channel closed");
                            return;
                        }
                    }
                }
                _ = seconds_clock.tick() => {
                    self.handle_seconds_tick().await;
                }
            }
        }
    }

    /// Forwards one snapshot downstream and tracks the health transition.
    async fn handle_poll_result(&mut self, result: PollResult) {
        if let Err(err) = self.data_writer.write(&result).await {
            warn!(unit = %self.unit_id, error = %err, "data delivery failed");
        }

        if self.status_writers.is_empty() {
            return;
        }

        let changed = match &result.error {
            None => {
                let mut changed = false;
                if self.snapshot.health != Health::Ok {
                    self.snapshot.health = Health::Ok;
                    changed = true;
                }
                if self.snapshot.last_error_code != 0 {
                    self.snapshot.last_error_code = 0;
                    changed = true;
                }
                if self.snapshot.seconds_in_error != 0 {
                    self.snapshot.seconds_in_error = 0;
                    changed = true;
                }
                changed
            }
            Some(error) => {
                let mut changed = false;
                if self.snapshot.health != Health::Error {
                    self.snapshot.health = Health::Error;
                    changed = true;
                }
                let code = error.raw_code();
                if self.snapshot.last_error_code != code {
                    self.snapshot.last_error_code = code;
                    changed = true;
                }
                changed
            }
        };

        if changed {
            self.broadcast_status().await;
        }
    }

    /// Advances the seconds-in-error counter while the unit is unhealthy.
    async fn handle_seconds_tick(&mut self) {
        if self.status_writers.is_empty() {
            return;
        }

        if self.snapshot.health != Health::Ok
            && self.snapshot.seconds_in_error < SECONDS_IN_ERROR_MAX
        {
            self.snapshot.seconds_in_error += 1;
            self.broadcast_status().await;
        }
    }

    /// Pushes the current snapshot to every status writer.
    ///
    /// Delivery failures are logged, never fatal; the writer's own
    /// re-assertion machinery repairs the replica on the next success.
    async fn broadcast_status(&mut self) {
        let snapshot = self.snapshot;
        for writer in &mut self.status_writers {
            if let Err(err) = writer.write_status(snapshot).await {
                warn!(
                    unit = %self.unit_id,
                    endpoint = %writer.plan().endpoint,
                    error = %err,
                    "status delivery failed"
                );
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeliveryError, SourceError};
    use crate::plan::{Plan, StatusPlan};
    use crate::status::SLOTS_PER_DEVICE;
    use crate::writer::EndpointClient;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingEndpoint {
        writes: Mutex<Vec<(u16, Vec<u16>)>>,
    }

    #[async_trait]
    impl EndpointClient for RecordingEndpoint {
        async fn write_bits(
            &self,
            _area: u8,
            _unit_id: u8,
            _address: u16,
            _bits: &[bool],
        ) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn write_registers(
            &self,
            _area: u8,
            _unit_id: u8,
            address: u16,
            registers: &[u16],
        ) -> Result<(), DeliveryError> {
            self.writes.lock().push((address, registers.to_vec()));
            Ok(())
        }
    }

    fn orchestrator() -> (Orchestrator, Arc<RecordingEndpoint>) {
        let endpoint = Arc::new(RecordingEndpoint::default());
        let status_writer = DeviceStatusWriter::new(
            StatusPlan {
                endpoint: "status-ep".to_string(),
                unit_id: 1,
                base_slot: 0,
                device_name: "DEV-01".to_string(),
            },
            endpoint.clone(),
        );
        let data_writer = DataWriter::new(Plan::default(), HashMap::new());
        (
            Orchestrator::new("u1", data_writer, vec![status_writer]),
            endpoint,
        )
    }

    fn ok_result() -> PollResult {
        PollResult::success("u1", Utc::now(), Vec::new())
    }

    fn error_result(code: u8) -> PollResult {
        PollResult::failure(
            "u1",
            Utc::now(),
            SourceError::Exception {
                function: 3,
                code,
            },
        )
    }

    #[tokio::test]
    async fn boot_asserts_identity_on_every_writer() {
        let (mut orch, endpoint) = orchestrator();
        orch.broadcast_status().await;

        let writes = endpoint.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1.len(), SLOTS_PER_DEVICE as usize);
        assert_eq!(writes[0].1[0], Health::Unknown.code());
    }

    #[tokio::test]
    async fn success_transitions_to_ok_and_clears_counters() {
        let (mut orch, endpoint) = orchestrator();
        orch.broadcast_status().await;

        orch.handle_poll_result(error_result(42)).await;
        orch.handle_seconds_tick().await;
        orch.handle_seconds_tick().await;
        endpoint.writes.lock().clear();

        orch.handle_poll_result(ok_result()).await;

        assert_eq!(orch.snapshot.health, Health::Ok);
        assert_eq!(orch.snapshot.last_error_code, 0);
        assert_eq!(orch.snapshot.seconds_in_error, 0);

        // The recovery produced delta writes for all three slots.
        let writes = endpoint.writes.lock();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], (0, vec![Health::Ok.code()]));
        assert_eq!(writes[1], (1, vec![0]));
        assert_eq!(writes[2], (2, vec![0]));
    }

    #[tokio::test]
    async fn error_records_the_raw_exception_code() {
        let (mut orch, _endpoint) = orchestrator();
        orch.broadcast_status().await;

        orch.handle_poll_result(error_result(11)).await;
        assert_eq!(orch.snapshot.health, Health::Error);
        assert_eq!(orch.snapshot.last_error_code, 11);
    }

    #[tokio::test]
    async fn generic_errors_map_to_code_one() {
        let (mut orch, _endpoint) = orchestrator();
        orch.broadcast_status().await;

        orch.handle_poll_result(PollResult::failure(
            "u1",
            Utc::now(),
            SourceError::NotConnected,
        ))
        .await;
        assert_eq!(orch.snapshot.last_error_code, 1);
    }

    #[tokio::test]
    async fn repeated_identical_errors_write_status_once() {
        let (mut orch, endpoint) = orchestrator();
        orch.broadcast_status().await;
        endpoint.writes.lock().clear();

        orch.handle_poll_result(error_result(42)).await;
        let after_first = endpoint.writes.lock().len();

        orch.handle_poll_result(error_result(42)).await;
        let after_second = endpoint.writes.lock().len();

        assert!(after_first > 0);
        assert_eq!(after_first, after_second, "unchanged snapshot is not re-sent");
    }

    #[tokio::test]
    async fn seconds_tick_counts_only_while_unhealthy() {
        let (mut orch, _endpoint) = orchestrator();
        orch.broadcast_status().await;

        // Unknown at boot counts as unhealthy.
        orch.handle_seconds_tick().await;
        assert_eq!(orch.snapshot.seconds_in_error, 1);

        orch.handle_poll_result(ok_result()).await;
        orch.handle_seconds_tick().await;
        assert_eq!(orch.snapshot.seconds_in_error, 0, "healthy units do not count");
    }

    #[tokio::test]
    async fn seconds_saturate_at_the_ceiling() {
        let (mut orch, _endpoint) = orchestrator();
        orch.broadcast_status().await;
        orch.handle_poll_result(error_result(1)).await;

        orch.snapshot.seconds_in_error = SECONDS_IN_ERROR_MAX - 1;
        orch.handle_seconds_tick().await;
        assert_eq!(orch.snapshot.seconds_in_error, SECONDS_IN_ERROR_MAX);

        orch.handle_seconds_tick().await;
        assert_eq!(
            orch.snapshot.seconds_in_error, SECONDS_IN_ERROR_MAX,
            "the ticker must not increment past the ceiling"
        );
    }

    #[tokio::test]
    async fn status_disabled_units_skip_all_status_work() {
        let data_writer = DataWriter::new(Plan::default(), HashMap::new());
        let mut orch = Orchestrator::new("u1", data_writer, Vec::new());

        orch.handle_poll_result(error_result(42)).await;
        orch.handle_seconds_tick().await;
        // Without writers the snapshot still tracks nothing worth asserting.
        assert_eq!(orch.snapshot.seconds_in_error, 0);
    }

    #[tokio::test]
    async fn run_honors_shutdown() {
        let (orch, _endpoint) = orchestrator();
        let (_tx, rx) = mpsc::channel(1);
        let (shutdown_tx, _) = broadcast::channel(1);

        let handle = tokio::spawn(orch.run(rx, shutdown_tx.subscribe()));
        tokio::task::yield_now().await;

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("orchestrator must honor shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn run_exits_when_the_runner_is_gone() {
        let (orch, _endpoint) = orchestrator();
        let (tx, rx) = mpsc::channel(1);
        let (shutdown_tx, _) = broadcast::channel(1);

        let handle = tokio::spawn(orch.run(rx, shutdown_tx.subscribe()));
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("orchestrator must exit once the channel closes")
            .unwrap();
    }
}
