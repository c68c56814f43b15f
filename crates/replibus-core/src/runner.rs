// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The poll runner task.
//!
//! One runner per unit: a ticker drives [`Poller::poll_once`] and delivers
//! every result to the unit's orchestrator. Tick overlap is impossible by
//! construction (a single task polls and delivers synchronously), and the
//! shutdown signal is honored between ticks and around delivery.

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::poller::Poller;
use crate::types::PollResult;

impl Poller {
    /// Runs the poll loop until shutdown or until the receiver is gone.
    ///
    /// Per-tick success is deliberately silent: at fleet scale a log line
    /// per cycle floods every sink. Failures surface through the status
    /// memory, not the log.
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
        tx: mpsc::Sender<PollResult>,
    ) {
        info!(unit = %self.config().unit_id, "poller started");

        let interval = self.config().interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(unit = %self.config().unit_id, "poller stopping");
                    return;
                }
                _ = ticker.tick() => {
                    let result = self.poll_once().await;

                    tokio::select! {
                        _ = shutdown.recv() => {
                            debug!(unit = %self.config().unit_id, "poller stopping");
                            return;
                        }
                        sent = tx.send(result) => {
                            if sent.is_err() {
                                // Orchestrator is gone; nothing left to feed.
                                debug!(unit = %self.config().unit_id, "snapshot channel closed");
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::poller::{PollerConfig, SourceClient, SourceFactory};
    use crate::types::ReadBlock;
    use async_trait::async_trait;
    use std::time::Duration;

    struct ZeroClient;

    #[async_trait]
    impl SourceClient for ZeroClient {
        async fn read_coils(&mut self, _a: u16, qty: u16) -> Result<Vec<bool>, SourceError> {
            Ok(vec![false; qty as usize])
        }
        async fn read_discrete_inputs(&mut self, _a: u16, qty: u16) -> Result<Vec<bool>, SourceError> {
            Ok(vec![false; qty as usize])
        }
        async fn read_holding_registers(&mut self, _a: u16, qty: u16) -> Result<Vec<u16>, SourceError> {
            Ok(vec![0; qty as usize])
        }
        async fn read_input_registers(&mut self, _a: u16, qty: u16) -> Result<Vec<u16>, SourceError> {
            Ok(vec![0; qty as usize])
        }
        async fn close(&mut self) {}
    }

    struct ZeroFactory;

    #[async_trait]
    impl SourceFactory for ZeroFactory {
        async fn connect(&self) -> Result<Box<dyn SourceClient>, SourceError> {
            Ok(Box::new(ZeroClient))
        }
    }

    fn fast_poller() -> Poller {
        Poller::new(
            PollerConfig {
                unit_id: "u1".to_string(),
                interval: Duration::from_millis(5),
                reads: vec![ReadBlock {
                    fc: 3,
                    address: 0,
                    quantity: 2,
                }],
            },
            Box::new(ZeroFactory),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn run_delivers_snapshots_in_order() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (tx, mut rx) = mpsc::channel(8);

        let handle = tokio::spawn(fast_poller().run(shutdown_tx.subscribe(), tx));

        let first = rx.recv().await.expect("first snapshot");
        let second = rx.recv().await.expect("second snapshot");
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(first.at <= second.at);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn run_exits_when_receiver_is_dropped() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (tx, rx) = mpsc::channel(1);

        let handle = tokio::spawn(fast_poller().run(shutdown_tx.subscribe(), tx));
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("runner must exit once the channel closes")
            .unwrap();
    }

    #[tokio::test]
    async fn run_exits_on_shutdown() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (tx, mut rx) = mpsc::channel(8);

        let handle = tokio::spawn(fast_poller().run(shutdown_tx.subscribe(), tx));
        rx.recv().await.expect("at least one snapshot");

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("runner must honor shutdown")
            .unwrap();
    }
}
