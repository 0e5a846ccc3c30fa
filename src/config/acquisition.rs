// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Frame acquisition configuration

use serde::{Deserialize, Serialize};

use crate::localization::TagId;

/// Backend producing frames and detections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSourceKind {
    /// Synthetic detections for a fixed ground-truth pose
    #[default]
    Simulated,
}

/// Configuration for the frame acquisition process.
///
/// The simulated backend reports, for the camera pose given here, what a
/// detector would see of every visible known tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Flag to enable or disable pose production.
    pub enabled: bool,

    #[serde(default)]
    pub source: FrameSourceKind,

    /// Ground-truth camera position in metres (world frame)
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,

    /// Ground-truth heading in degrees
    #[serde(default)]
    pub yaw_degrees: f64,

    /// Standard deviation of the noise added to each translation, in metres
    #[serde(default)]
    pub noise_stddev: f64,

    /// Tags in view; empty means every known tag
    #[serde(default)]
    pub visible_tags: Vec<TagId>,

    /// Probability that a frame read fails
    #[serde(default)]
    pub dropout_probability: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: FrameSourceKind::Simulated,
            x: 0.6,
            y: -1.5,
            z: 0.0,
            yaw_degrees: 0.0,
            noise_stddev: 0.002,
            visible_tags: Vec::new(),
            dropout_probability: 0.0,
        }
    }
}
