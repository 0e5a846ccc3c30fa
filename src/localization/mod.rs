// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Camera localization from fiducial tags
//!
//! This module turns the per-tag poses reported by an AprilTag detector into a
//! single camera pose in the world frame:
//!
//! - [`transform::TagPoseTransformer`] converts one detection into a
//!   [`CameraPoseCandidate`] using the known world anchor of the tag.
//! - [`fusion::PoseFuser`] averages all candidates of a frame into a
//!   [`FusedPose`].
//!
//! ## Frames
//!
//! The detector reports poses in camera axes (X right, Y down, Z forward).
//! The application world frame keeps X, uses the camera-forward axis as the
//! ground-plane Y axis and points Z up:
//!
//! | World | Detector |
//! |-------|----------|
//! | X     | X        |
//! | Y     | -Z       |
//! | Z     | -Y       |

pub mod fusion;
pub mod transform;

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Matrix3, Vector3};

pub use fusion::{PoseFuser, YawAveraging};
pub use transform::TagPoseTransformer;

/// Identity encoded by a tag
pub type TagId = u32;

/// Pose of one tag as reported by the detector (camera to tag)
#[derive(Debug, Clone, PartialEq)]
pub struct TagDetection {
    pub tag_id: TagId,
    /// Rotation, camera to tag
    pub rotation: Matrix3<f64>,
    /// Translation in metres, camera to tag
    pub translation: Vector3<f64>,
}

impl TagDetection {
    pub fn new(tag_id: TagId, rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            tag_id,
            rotation,
            translation,
        }
    }
}

/// Known world positions of the tags, in metres
///
/// Read-only once built. Detections of tags missing from this table are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct KnownTagAnchors {
    anchors: HashMap<TagId, Vector3<f64>>,
}

impl KnownTagAnchors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configuration entries
    pub fn from_config(known_tags: &BTreeMap<TagId, [f64; 3]>) -> Self {
        let anchors = known_tags
            .iter()
            .map(|(id, p)| (*id, Vector3::new(p[0], p[1], p[2])))
            .collect();
        Self { anchors }
    }

    pub fn with_anchor(mut self, tag_id: TagId, position: Vector3<f64>) -> Self {
        self.anchors.insert(tag_id, position);
        self
    }

    pub fn get(&self, tag_id: TagId) -> Option<&Vector3<f64>> {
        self.anchors.get(&tag_id)
    }

    pub fn contains(&self, tag_id: TagId) -> bool {
        self.anchors.contains_key(&tag_id)
    }

    /// Tag identities, in ascending order
    pub fn ids(&self) -> Vec<TagId> {
        let mut ids: Vec<TagId> = self.anchors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Camera pose derived from exactly one tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPoseCandidate {
    pub tag_id: TagId,
    /// World position in metres
    pub position: Vector3<f64>,
    /// Heading about the world vertical axis, radians in (-π, π]
    pub yaw: f64,
}

/// Camera pose averaged over every candidate of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedPose {
    /// World position in metres
    pub position: Vector3<f64>,
    /// Heading in radians
    pub yaw: f64,
    /// Number of candidates that contributed
    pub tag_count: usize,
}

impl FusedPose {
    pub fn new(position: Vector3<f64>, yaw: f64, tag_count: usize) -> Self {
        Self {
            position,
            yaw,
            tag_count,
        }
    }

    pub fn yaw_degrees(&self) -> f64 {
        self.yaw.to_degrees()
    }
}
