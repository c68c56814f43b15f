// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! End-to-end pipeline tests: Modbus TCP in, Raw Ingest v1 out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use replibus_core::{
    DataWriter, EndpointClients, FcOffsets, MemoryDest, Plan, Poller, PollerConfig, ReadBlock,
    TargetEndpoint,
};
use replibus_ingest::RawIngestClient;
use replibus_modbus::ModbusConnector;

use replibus_tests::common::mocks::{MockSource, ReadScript, RecordedWrite, MockEndpoint};

// =============================================================================
// Loopback Servers
// =============================================================================

/// Minimal Modbus TCP device: answers every FC 3 read with the given
/// registers until the peer disconnects.
async fn modbus_device(registers: Vec<u16>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        loop {
            let mut request = [0u8; 12];
            if socket.read_exact(&mut request).await.is_err() {
                return;
            }

            let mut response = Vec::new();
            response.extend_from_slice(&request[0..2]);
            response.extend_from_slice(&0u16.to_be_bytes());
            response.extend_from_slice(&((3 + registers.len() * 2) as u16).to_be_bytes());
            response.push(request[6]);
            response.push(request[7]);
            response.push((registers.len() * 2) as u8);
            for reg in &registers {
                response.extend_from_slice(&reg.to_be_bytes());
            }

            if socket.write_all(&response).await.is_err() {
                return;
            }
        }
    });

    addr
}

/// Minimal ingest endpoint: captures raw packets and always accepts.
async fn ingest_endpoint(captured: Arc<parking_lot::Mutex<Vec<Vec<u8>>>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let captured = captured.clone();
            tokio::spawn(async move {
                let mut header = [0u8; 10];
                if socket.read_exact(&mut header).await.is_err() {
                    return;
                }
                let count = u16::from_be_bytes([header[8], header[9]]);
                let payload_len = match header[3] {
                    1 | 2 => usize::from(count).div_ceil(8),
                    _ => usize::from(count) * 2,
                };
                let mut payload = vec![0u8; payload_len];
                if socket.read_exact(&mut payload).await.is_err() {
                    return;
                }

                let mut packet = header.to_vec();
                packet.extend_from_slice(&payload);
                captured.lock().push(packet);

                let _ = socket.write_all(&[0x00]).await;
            });
        }
    });

    addr
}

// =============================================================================
// Tests
// =============================================================================

/// Happy path over real sockets: one unit, one target with offset
/// `{3: 100}`, one FC 3 read of two registers. The poll must produce
/// exactly one ingest packet with the locked header and payload.
#[tokio::test]
async fn happy_path_produces_the_exact_ingest_packet() {
    let device_addr = modbus_device(vec![0x0011, 0x0022]).await;

    let captured = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let ingest_addr = ingest_endpoint(captured.clone()).await;

    // Upstream half.
    let connector =
        ModbusConnector::new(&device_addr, 1, Duration::from_secs(1)).unwrap();
    let mut poller = Poller::new(
        PollerConfig {
            unit_id: "u1".to_string(),
            interval: Duration::from_millis(100),
            reads: vec![ReadBlock {
                fc: 3,
                address: 10,
                quantity: 2,
            }],
        },
        Box::new(connector),
    )
    .unwrap();

    // Downstream half.
    let mut offsets = FcOffsets::NONE;
    offsets.set(3, 100);
    let plan = Plan {
        unit_id: "u1".to_string(),
        targets: vec![TargetEndpoint {
            target_id: 1,
            endpoint: ingest_addr.clone(),
            unit_id: 1,
            memories: vec![MemoryDest { offsets }],
        }],
        status: Vec::new(),
    };

    let mut clients: EndpointClients = HashMap::new();
    clients.insert(
        ingest_addr.clone(),
        Arc::new(RawIngestClient::new(ingest_addr, Duration::from_secs(1)).unwrap()),
    );
    let writer = DataWriter::new(plan, clients);

    // One tick of the pipeline.
    let result = poller.poll_once().await;
    assert!(result.is_ok(), "poll failed: {:?}", result.error);
    writer.write(&result).await.unwrap();

    let packets = captured.lock();
    assert_eq!(packets.len(), 1);
    assert_eq!(
        packets[0],
        vec![0x52, 0x49, 0x01, 0x03, 0x00, 0x01, 0x00, 0x6E, 0x00, 0x02, 0x00, 0x11, 0x00, 0x22],
        "header must be 52 49 01 03 00 01 00 6E 00 02 with payload 00 11 00 22"
    );
}

/// The runner and orchestrator cooperate over the snapshot channel: every
/// committed snapshot reaches the data writer with the offset applied.
#[tokio::test]
async fn runner_feeds_the_orchestrator() {
    let source = MockSource::new();
    source.push(ReadScript::Registers(vec![7, 8]));
    source.push(ReadScript::Registers(vec![9, 10]));

    let mut poller = Poller::new(
        PollerConfig {
            unit_id: "u1".to_string(),
            interval: Duration::from_millis(5),
            reads: vec![ReadBlock {
                fc: 3,
                address: 0,
                quantity: 2,
            }],
        },
        Box::new(source.clone()),
    )
    .unwrap();

    let endpoint = MockEndpoint::new();
    let mut offsets = FcOffsets::NONE;
    offsets.set(3, 50);
    let plan = Plan {
        unit_id: "u1".to_string(),
        targets: vec![TargetEndpoint {
            target_id: 1,
            endpoint: "mock".to_string(),
            unit_id: 1,
            memories: vec![MemoryDest { offsets }],
        }],
        status: Vec::new(),
    };
    let mut clients: EndpointClients = HashMap::new();
    clients.insert("mock".to_string(), endpoint.clone());
    let writer = DataWriter::new(plan, clients);

    // Drive two ticks by hand; the runner loop itself is covered in the
    // core crate.
    let (tx, mut rx) = mpsc::channel(4);
    let (shutdown_tx, _) = broadcast::channel(1);
    let handle = tokio::spawn(poller.run(shutdown_tx.subscribe(), tx));

    for _ in 0..2 {
        let result = rx.recv().await.expect("snapshot");
        writer.write(&result).await.unwrap();
    }
    shutdown_tx.send(()).unwrap();
    let _ = handle.await;

    let writes = endpoint.writes.lock();
    assert_eq!(writes.len(), 2);
    assert_eq!(
        writes[0],
        RecordedWrite::Registers {
            area: 3,
            unit_id: 1,
            address: 50,
            registers: vec![7, 8],
        }
    );
    assert_eq!(
        writes[1],
        RecordedWrite::Registers {
            area: 3,
            unit_id: 1,
            address: 50,
            registers: vec![9, 10],
        }
    );
}

/// A dead-transport failure mid-stream forces exactly one reconnect on the
/// following cycle.
#[tokio::test]
async fn dead_transport_reconnects_on_the_next_cycle() {
    let source = MockSource::new();
    source.push(ReadScript::Fail(Box::new(|| {
        replibus_core::SourceError::Io {
            kind: std::io::ErrorKind::Other,
            message: "an existing connection was forcibly closed by the remote host".to_string(),
        }
    })));

    let mut poller = Poller::new(
        PollerConfig {
            unit_id: "u1".to_string(),
            interval: Duration::from_millis(5),
            reads: vec![ReadBlock {
                fc: 3,
                address: 0,
                quantity: 1,
            }],
        },
        Box::new(source.clone()),
    )
    .unwrap();

    let state = source.state();

    let first = poller.poll_once().await;
    assert!(first.error.is_some());
    assert_eq!(*state.connects.lock(), 1);
    assert_eq!(*state.closes.lock(), 1, "dead client must be closed");

    let second = poller.poll_once().await;
    assert!(second.is_ok());
    assert_eq!(
        *state.connects.lock(),
        2,
        "the factory is invoked exactly once before the first read of the next tick"
    );
}
