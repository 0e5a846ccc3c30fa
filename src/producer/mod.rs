// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pose production loop
//!
//! Each iteration captures a frame, detects tags, converts every known tag into
//! a camera pose candidate, fuses the candidates and writes the encoded block
//! to the register transport in one request. Failures are reported and contained
//! to the frame; the block is left untouched when no pose is available.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use log::{debug, info};
use tokio::time;

use crate::acquisition::{FrameSource, TagDetector};
use crate::codec::{RegisterCodec, RegisterEncoding, ScaledIntegerCodec};
use crate::localization::{FusedPose, PoseFuser, TagPoseTransformer};
use crate::reporting::{ErrorReporter, LocalizerError};
use crate::retry::RetryPolicy;
use crate::transport::RegisterTransport;

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// A pose was fused and its block written
    Published(FusedPose),
    /// No known tag produced a candidate; registers were left as they were
    NoPose { detected: usize },
    /// The frame was dropped by an acquisition, detection or write failure
    Failed(LocalizerError),
}

impl FrameOutcome {
    /// Whether this outcome counts against the retry policy
    pub fn is_failure(&self) -> bool {
        matches!(self, FrameOutcome::Failed(_))
    }
}

/// Capture → transform → fuse → encode → write
pub struct PoseProducer {
    source: Box<dyn FrameSource>,
    detector: Box<dyn TagDetector>,
    transformer: TagPoseTransformer,
    fuser: PoseFuser,
    codec: Box<dyn RegisterCodec>,
    transport: Arc<dyn RegisterTransport>,
    base_address: u16,
    reporter: Arc<ErrorReporter>,
}

impl PoseProducer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn TagDetector>,
        transformer: TagPoseTransformer,
        fuser: PoseFuser,
        codec: Box<dyn RegisterCodec>,
        transport: Arc<dyn RegisterTransport>,
        base_address: u16,
        reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            source,
            detector,
            transformer,
            fuser,
            codec,
            transport,
            base_address,
            reporter,
        }
    }

    fn fail(&self, err: LocalizerError) -> FrameOutcome {
        self.reporter.report(&err);
        FrameOutcome::Failed(err)
    }

    /// Process a single frame
    pub async fn process_frame(&mut self) -> FrameOutcome {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => return self.fail(e),
        };

        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => return self.fail(e),
        };
        let ids: Vec<_> = detections.iter().map(|d| d.tag_id).collect();
        debug!("Frame {}: detected tags {:?}", frame.sequence, ids);

        let (candidates, errors) = self.transformer.transform_all(&detections);
        self.reporter.report_all(&errors);

        let Some(pose) = self.fuser.fuse(&candidates) else {
            debug!(
                "Frame {}: no pose ({} detection(s), none usable)",
                frame.sequence,
                detections.len()
            );
            return FrameOutcome::NoPose {
                detected: detections.len(),
            };
        };

        debug!(
            "Frame {}: pose x={:.3} m, y={:.3} m, z={:.3} m, yaw={:.1}° from {} tag(s)",
            frame.sequence,
            pose.position.x,
            pose.position.y,
            pose.position.z,
            pose.yaw_degrees(),
            pose.tag_count
        );
        if self.codec.encoding() == RegisterEncoding::ScaledInteger {
            let ([x, y, z, yaw], _) = ScaledIntegerCodec::quantize_pose(&pose);
            debug!(
                "Frame {}: registers x={} dm, y={} dm, z={} dm, yaw={}°",
                frame.sequence, x, y, z, yaw
            );
        }

        let block = self.codec.encode(&pose);
        self.reporter.report_all(&block.issues);

        match self
            .transport
            .write_block(self.base_address, &block.words)
            .await
        {
            Ok(()) => FrameOutcome::Published(pose),
            Err(e) => self.fail(e),
        }
    }

    /// Run until `running` is cleared or the failure budget is exhausted
    pub async fn run(mut self, policy: RetryPolicy, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Pose producer started ({:?} encoding at register {}, every {:?})",
            self.codec.encoding(),
            self.base_address,
            policy.interval
        );
        let mut failures = policy.tracker("Pose producer");

        while running.load(Ordering::SeqCst) {
            if self.process_frame().await.is_failure() {
                failures.failure()?;
            } else {
                failures.success();
            }
            time::sleep(policy.interval).await;
        }

        info!("Pose producer stopped");
        Ok(())
    }
}
