// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use rust_tag_localizer::client::PoseReceiver;
use rust_tag_localizer::codec::RegisterEncoding;
use rust_tag_localizer::config::Config;
use rust_tag_localizer::link::AckSender;
use rust_tag_localizer::reporting::{ErrorReporter, LogSink};
use rust_tag_localizer::retry::RetryPolicy;
use rust_tag_localizer::transport::{ModbusClientTransport, RegisterTransport};

/// Modbus client reading the camera pose published by the tag localizer
///
/// The register layout, timeout and acknowledgement cadence come from the
/// localizer configuration; command line flags override it.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the localizer configuration file (YAML format)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Modbus server address
    #[clap(long)]
    address: Option<String>,

    /// Modbus server port
    #[clap(long)]
    port: Option<u16>,

    /// Register encoding (scaled_integer or float_pair)
    #[clap(long)]
    encoding: Option<RegisterEncoding>,

    /// First holding register of the pose block
    #[clap(long)]
    base_address: Option<u16>,

    /// Coil used for the acknowledgement flag
    #[clap(long)]
    ack_coil: Option<u16>,

    /// Request timeout in milliseconds
    #[clap(long)]
    timeout_ms: Option<u64>,

    /// Milliseconds between two reads of the pose block
    #[clap(long, default_value = "1000")]
    read_interval_ms: u64,

    /// Enable verbose logging (debug level)
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default_level),
    );

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_args(None, args.address, args.port, args.encoding);
    let modbus = &mut config.modbus;
    if let Some(base_address) = args.base_address {
        modbus.base_address = base_address;
    }
    if let Some(ack_coil) = args.ack_coil {
        modbus.ack_coil = ack_coil;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        modbus.timeout_ms = timeout_ms;
    }

    let socket_addr = tokio::net::lookup_host((modbus.address.as_str(), modbus.port))
        .await
        .with_context(|| format!("Failed to resolve {}:{}", modbus.address, modbus.port))?
        .next()
        .with_context(|| format!("No address found for {}", modbus.address))?;

    let transport: Arc<dyn RegisterTransport> =
        Arc::new(ModbusClientTransport::connect(socket_addr, modbus.timeout()).await?);
    let reporter = Arc::new(ErrorReporter::new());
    let running = Arc::new(AtomicBool::new(true));

    let receiver = PoseReceiver::new(
        transport.clone(),
        modbus.encoding.codec(),
        modbus.base_address,
        Arc::new(LogSink),
        reporter.clone(),
    );
    let sender = AckSender::new(transport, modbus.ack_coil, reporter);

    let receive_task = tokio::spawn(receiver.run(
        RetryPolicy::forever(Duration::from_millis(args.read_interval_ms)),
        running.clone(),
    ));
    let ack_task = tokio::spawn(sender.run(config.link.policy(), running.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, stopping client");
    running.store(false, Ordering::SeqCst);

    for task in [receive_task, ack_task] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Client task failed: {:#}", e),
            Err(e) => error!("Client task panicked: {}", e),
        }
    }
    Ok(())
}
