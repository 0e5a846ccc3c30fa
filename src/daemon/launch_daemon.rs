// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;

use crate::acquisition::build_backend;
use crate::config::Config;
use crate::link::LinkMonitor;
use crate::localization::{KnownTagAnchors, PoseFuser, TagPoseTransformer};
use crate::modbus::serve;
use crate::producer::PoseProducer;
use crate::registers::RegisterBank;
use crate::reporting::ErrorReporter;
use crate::transport::{LocalRegisterTransport, RegisterTransport};

/// Seconds between two heartbeat log lines
const HEARTBEAT_PERIOD_S: u64 = 60;

/// Represents the set of background tasks of the localizer
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    /// Signalled when a task ends with an error
    stopped: Arc<Notify>,
    registers: RegisterBank,
    reporter: Arc<ErrorReporter>,
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(Notify::new()),
            registers: RegisterBank::new(0),
            reporter: Arc::new(ErrorReporter::new()),
            modbus_addr: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// Fails when the Modbus listener cannot be bound or the acquisition
    /// backend cannot be built.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        self.registers = RegisterBank::new(config.modbus.capacity);

        if config.modbus.enabled {
            self.start_modbus_server(config).await?;
        }

        if config.acquisition.enabled {
            self.start_pose_producer(config)?;
        }

        if config.link.enabled {
            self.start_link_monitor(config)?;
        }

        self.start_heartbeat()?;

        Ok(())
    }

    /// Registers published by the Modbus server
    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    pub fn reporter(&self) -> Arc<ErrorReporter> {
        self.reporter.clone()
    }

    /// Address the Modbus server is actually bound to
    pub fn modbus_address(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// Spawn a task; an error ending it stops the whole daemon
    fn spawn_task<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let running = self.running.clone();
        let stopped = self.stopped.clone();
        let handle = tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = &result {
                error!("{} terminated: {:#}", name, e);
                running.store(false, Ordering::SeqCst);
                stopped.notify_one();
            }
            result
        });
        self.tasks.push(handle);
    }

    /// Launch the Modbus server
    ///
    /// The listener is bound before the task is spawned, so a bad address or a
    /// port already in use is reported to the caller.
    async fn start_modbus_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting modbus server on {}:{}",
            config.modbus.address, config.modbus.port
        );
        let listener = TcpListener::bind((config.modbus.address.as_str(), config.modbus.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind Modbus server on {}:{}",
                    config.modbus.address, config.modbus.port
                )
            })?;
        let local_addr = listener.local_addr()?;
        self.modbus_addr = Some(local_addr);

        let registers = self.registers.clone();
        let running = self.running.clone();
        self.spawn_task("Modbus server", async move {
            let server_handle = tokio::spawn(async move {
                if let Err(e) = serve(listener, registers).await {
                    error!("Modbus server error: {}", e);
                }
            });

            while running.load(Ordering::SeqCst) && !server_handle.is_finished() {
                time::sleep(Duration::from_millis(250)).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();
            match time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => warn!("Modbus server shutdown timed out, forcing termination"),
            }
            Ok(())
        });

        info!("Modbus server listening on {}", local_addr);
        Ok(())
    }

    /// Start the pose production loop on the local register bank
    fn start_pose_producer(&mut self, config: &Config) -> Result<()> {
        info!("Starting pose producer");

        let (source, detector) = build_backend(&config.acquisition, &config.localization)
            .context("Failed to build the acquisition backend")?;
        let transport: Arc<dyn RegisterTransport> =
            Arc::new(LocalRegisterTransport::new(self.registers.clone()));

        let producer = PoseProducer::new(
            source,
            detector,
            TagPoseTransformer::new(KnownTagAnchors::from_config(
                &config.localization.known_tags,
            )),
            PoseFuser::new(config.localization.yaw_averaging),
            config.modbus.encoding.codec(),
            transport,
            config.modbus.base_address,
            self.reporter.clone(),
        );

        let policy = config.producer.policy();
        let running = self.running.clone();
        self.spawn_task("Pose producer", producer.run(policy, running));
        Ok(())
    }

    /// Start the acknowledgement link monitor
    fn start_link_monitor(&mut self, config: &Config) -> Result<()> {
        info!("Starting link monitor on coil {}", config.modbus.ack_coil);

        let monitor = LinkMonitor::new(
            self.registers.clone(),
            config.modbus.ack_coil,
            config.link.stale_after,
            self.reporter.clone(),
        );

        let policy = config.link.policy();
        let running = self.running.clone();
        self.spawn_task("Link monitor", monitor.run(policy, running));
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let reporter = self.reporter.clone();
        self.spawn_task("Heartbeat", async move {
            let mut ticks = 0u64;
            while running.load(Ordering::SeqCst) {
                if ticks % HEARTBEAT_PERIOD_S == 0 {
                    debug!(
                        "Daemon heartbeat: running, {} error(s) reported",
                        reporter.total()
                    );
                }
                ticks += 1;
                time::sleep(Duration::from_secs(1)).await;
            }
            Ok(())
        });
        Ok(())
    }

    /// Wait until a task stops with an error
    pub async fn stopped(&self) {
        self.stopped.notified().await;
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Returns the first error a task ended with.
    pub async fn join(self) -> Result<()> {
        let mut first_error = None;
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
