// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Frame acquisition and tag detection
//!
//! Camera capture and AprilTag detection are external collaborators. The
//! producer only sees them through two capabilities:
//!
//! - [`FrameSource`]: yields the next frame or an acquisition failure
//! - [`TagDetector`]: turns a frame into per-tag poses
//!
//! A simulated backend is provided so the whole chain can run without
//! hardware.

pub mod simulated;

use chrono::{DateTime, Utc};

use crate::config::{AcquisitionConfig, FrameSourceKind, LocalizationConfig};
use crate::localization::{KnownTagAnchors, TagDetection};
use crate::reporting::LocalizerError;

pub use simulated::{SimulatedCamera, SimulatedTagDetector};

/// Largest accepted frame edge, in pixels
pub const MAX_FRAME_DIMENSION: u32 = 16384;

/// Tag families the detectors understand
pub const SUPPORTED_TAG_FAMILIES: &[&str] = &[
    "tag16h5",
    "tag25h9",
    "tag36h10",
    "tag36h11",
    "tagCircle21h7",
    "tagStandard41h12",
];

/// One captured image
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Monotonic frame counter
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    /// 8-bit grayscale pixels, row-major
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Number of pixels of a `width` x `height` frame, `None` if it does not
    /// fit in memory addressing
    pub fn pixel_count(width: u32, height: u32) -> Option<usize> {
        usize::try_from(width)
            .ok()?
            .checked_mul(usize::try_from(height).ok()?)
    }
}

/// Represents a camera or any other image stream
pub trait FrameSource: Send {
    /// Read the next frame
    fn next_frame(&mut self) -> Result<Frame, LocalizerError>;
}

/// Represents an AprilTag detector with pose estimation
pub trait TagDetector: Send {
    /// Detect tags and estimate their pose relative to the camera
    fn detect(&mut self, frame: &Frame) -> Result<Vec<TagDetection>, LocalizerError>;
}

/// Build the frame source and detector selected by the configuration
pub fn build_backend(
    acquisition: &AcquisitionConfig,
    localization: &LocalizationConfig,
) -> anyhow::Result<(Box<dyn FrameSource>, Box<dyn TagDetector>)> {
    match acquisition.source {
        FrameSourceKind::Simulated => {
            if !SUPPORTED_TAG_FAMILIES.contains(&localization.tag_family.as_str()) {
                anyhow::bail!(
                    "Unsupported tag family '{}' (expected one of {})",
                    localization.tag_family,
                    SUPPORTED_TAG_FAMILIES.join(", ")
                );
            }
            let anchors = KnownTagAnchors::from_config(&localization.known_tags);
            if anchors.is_empty() {
                anyhow::bail!("The simulated detector needs at least one known tag");
            }
            let camera = SimulatedCamera::new(acquisition, &localization.camera);
            let detector = SimulatedTagDetector::new(
                acquisition,
                &localization.camera,
                localization.tag_size,
                anchors,
            );
            Ok((Box::new(camera), Box::new(detector)))
        }
    }
}
