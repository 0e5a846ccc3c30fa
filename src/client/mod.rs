// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Consumer side: read the pose block, decode it and hand it to a record sink

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use log::{debug, info};
use tokio::time;

use crate::codec::{DecodedPose, RegisterCodec};
use crate::reporting::{ErrorReporter, LocalizerError, PoseRecord, RecordSink};
use crate::retry::RetryPolicy;
use crate::transport::RegisterTransport;

/// Periodic reader of the pose block
pub struct PoseReceiver {
    transport: Arc<dyn RegisterTransport>,
    codec: Box<dyn RegisterCodec>,
    base_address: u16,
    sink: Arc<dyn RecordSink>,
    reporter: Arc<ErrorReporter>,
}

impl PoseReceiver {
    pub fn new(
        transport: Arc<dyn RegisterTransport>,
        codec: Box<dyn RegisterCodec>,
        base_address: u16,
        sink: Arc<dyn RecordSink>,
        reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            transport,
            codec,
            base_address,
            sink,
            reporter,
        }
    }

    async fn read_pose(&self) -> Result<DecodedPose, LocalizerError> {
        // Block lengths are 6 or 9 words
        let count = self.codec.block_len() as u16;
        let words = self.transport.read_block(self.base_address, count).await?;
        debug!("Read block at {}: {:04X?}", self.base_address, words);
        self.codec.decode(&words)
    }

    /// Read and decode one block; every outcome is appended to the sink
    pub async fn receive_once(&self) -> Result<DecodedPose, LocalizerError> {
        match self.read_pose().await {
            Ok(pose) => {
                match pose.yaw {
                    Some(yaw) => info!(
                        "Pose x={:.3} m, y={:.3} m, z={:.3} m, yaw={:.0}°",
                        pose.x,
                        pose.y,
                        pose.z,
                        yaw.to_degrees()
                    ),
                    None => info!("Pose x={:.3} m, y={:.3} m, z={:.3} m", pose.x, pose.y, pose.z),
                }
                self.sink.append(PoseRecord::pose(&pose));
                Ok(pose)
            }
            Err(e) => {
                let report = self.reporter.report(&e);
                self.sink.append(PoseRecord::error(&report));
                Err(e)
            }
        }
    }

    pub async fn run(self, policy: RetryPolicy, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Pose receiver started ({:?} encoding at register {}, every {:?})",
            self.codec.encoding(),
            self.base_address,
            policy.interval
        );
        let mut failures = policy.tracker("Pose receiver");

        while running.load(Ordering::SeqCst) {
            match self.receive_once().await {
                Ok(_) => failures.success(),
                Err(_) => failures.failure()?,
            }
            time::sleep(policy.interval).await;
        }
        Ok(())
    }
}
