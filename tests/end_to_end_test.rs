// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Producer daemon → Modbus/TCP → consumer, with the simulated backend

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use tokio::time;

use rust_tag_localizer::client::PoseReceiver;
use rust_tag_localizer::codec::{RegisterCodec, RegisterEncoding};
use rust_tag_localizer::config::Config;
use rust_tag_localizer::daemon::Daemon;
use rust_tag_localizer::link::AckSender;
use rust_tag_localizer::reporting::{ErrorCategory, ErrorReporter, MemorySink, PoseRecord};
use rust_tag_localizer::transport::{ModbusClientTransport, RegisterTransport};

fn test_config(encoding: RegisterEncoding) -> Config {
    let mut config = Config::default();
    config.modbus.address = "127.0.0.1".to_string();
    config.modbus.port = 0;
    config.modbus.base_address = 10;
    config.modbus.encoding = encoding;
    config.acquisition.x = 0.6;
    config.acquisition.y = -1.5;
    config.acquisition.z = 0.1;
    config.acquisition.yaw_degrees = 20.0;
    config.acquisition.noise_stddev = 0.0;
    config.producer.interval_ms = 10;
    config.link.interval_ms = 20;
    config.link.stale_after = 2;
    config
}

async fn connect(daemon: &Daemon) -> anyhow::Result<Arc<dyn RegisterTransport>> {
    let addr = daemon
        .modbus_address()
        .ok_or_else(|| anyhow::anyhow!("Modbus server not started"))?;
    let transport = ModbusClientTransport::connect(addr, Duration::from_secs(1)).await?;
    Ok(Arc::new(transport))
}

#[tokio::test]
async fn test_float_pose_reaches_the_consumer() -> anyhow::Result<()> {
    let config = test_config(RegisterEncoding::FloatPair);
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    time::sleep(Duration::from_millis(100)).await;

    let sink = Arc::new(MemorySink::new());
    let receiver = PoseReceiver::new(
        connect(&daemon).await?,
        RegisterEncoding::FloatPair.codec(),
        10,
        sink.clone(),
        Arc::new(ErrorReporter::new()),
    );
    let pose = receiver.receive_once().await?;

    assert_relative_eq!(pose.x, 0.6, epsilon = 1e-6);
    assert_relative_eq!(pose.y, -1.5, epsilon = 1e-6);
    assert_relative_eq!(pose.z, 0.1, epsilon = 1e-6);
    assert_eq!(pose.yaw, None);
    assert_eq!(sink.records().len(), 1);

    // The consumer sees exactly what the producer holds in its register bank
    let words = daemon
        .registers()
        .read_holding_registers(10, 6)
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    assert_eq!(RegisterEncoding::FloatPair.codec().decode(&words)?, pose);

    daemon.shutdown();
    daemon.join().await
}

#[tokio::test]
async fn test_scaled_pose_reaches_the_consumer() -> anyhow::Result<()> {
    let config = test_config(RegisterEncoding::ScaledInteger);
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    time::sleep(Duration::from_millis(100)).await;

    let sink = Arc::new(MemorySink::new());
    let receiver = PoseReceiver::new(
        connect(&daemon).await?,
        RegisterEncoding::ScaledInteger.codec(),
        10,
        sink.clone(),
        Arc::new(ErrorReporter::new()),
    );
    receiver.receive_once().await?;

    match sink.records().as_slice() {
        [PoseRecord::Pose {
            x,
            y,
            z,
            yaw_degrees,
            ..
        }] => {
            assert_eq!((*x, *y, *z), (0.6, -1.5, 0.1));
            assert_eq!(yaw_degrees.map(f64::round), Some(20.0));
        }
        other => panic!("unexpected records {:?}", other),
    }

    daemon.shutdown();
    daemon.join().await
}

#[tokio::test]
async fn test_link_goes_stale_then_acknowledgement_is_consumed() -> anyhow::Result<()> {
    let mut config = test_config(RegisterEncoding::FloatPair);
    config.acquisition.enabled = false;
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    // No consumer yet: the monitor reports the link as stale
    time::sleep(Duration::from_millis(150)).await;
    assert_eq!(daemon.reporter().count(ErrorCategory::Acknowledgement), 1);

    let transport = connect(&daemon).await?;
    let sender = AckSender::new(transport.clone(), 0, Arc::new(ErrorReporter::new()));
    sender.send().await?;

    // The monitor clears the flag on its next sample
    let mut cleared = false;
    for _ in 0..50 {
        time::sleep(Duration::from_millis(20)).await;
        if !transport.read_coil(0).await? {
            cleared = true;
            break;
        }
    }
    assert!(cleared, "acknowledgement flag was never consumed");

    daemon.shutdown();
    daemon.join().await
}

#[tokio::test]
async fn test_port_in_use_is_fatal_at_startup() -> anyhow::Result<()> {
    let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let mut config = test_config(RegisterEncoding::FloatPair);
    config.modbus.port = blocker.local_addr()?.port();

    let mut daemon = Daemon::new();
    let err = daemon.launch(&config).await.unwrap_err();

    assert!(err.to_string().contains("Failed to bind Modbus server"));
    Ok(())
}
