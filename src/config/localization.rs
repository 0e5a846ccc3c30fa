// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Localization configuration
//!
//! Known tag anchors, yaw averaging policy and the camera parameters forwarded
//! to the tag detector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::localization::{TagId, YawAveraging};

/// Pinhole intrinsics and lens distortion of the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// k1, k2, p1, p2, k3
    pub distortion: [f64; 5],
    /// Frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fx: 1428.6,
            fy: 1420.1,
            cx: 647.95,
            cy: 328.6,
            distortion: [-0.0398, 2.522, 0.0011, 0.0017, -11.4147],
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Configuration of the pose estimation.
///
/// `known_tags` maps every tag identity to its world position in metres.
/// Detections of other tags are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationConfig {
    pub known_tags: BTreeMap<TagId, [f64; 3]>,

    /// How the yaw of several tags is averaged
    #[serde(default)]
    pub yaw_averaging: YawAveraging,

    #[serde(default)]
    pub camera: CameraConfig,

    /// Tag edge length in metres
    #[serde(default = "default_tag_size")]
    pub tag_size: f64,

    #[serde(default = "default_tag_family")]
    pub tag_family: String,
}

fn default_tag_size() -> f64 {
    0.162
}

fn default_tag_family() -> String {
    "tag36h11".to_string()
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        let known_tags = [
            (0, [0.0, 0.0, 0.0]),
            (1, [0.4, 0.0, 0.0]),
            (2, [0.8, 0.0, 0.0]),
            (3, [1.2, 0.0, 0.0]),
        ]
        .into_iter()
        .collect();

        Self {
            known_tags,
            yaw_averaging: YawAveraging::default(),
            camera: CameraConfig::default(),
            tag_size: default_tag_size(),
            tag_family: default_tag_family(),
        }
    }
}
