// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-tag camera pose
//!
//! For a detection `(R, t)` of a tag anchored at `A`:
//!
//! 1. the camera position in detector axes is `A - Rᵀ·t`,
//! 2. axes are remapped to world axes: `(x, y, z) -> (x, -z, -y)`,
//! 3. the yaw is `atan2(M[1][0], M[0][0])` where `M` is `R` with its columns
//!    reordered as `(0, 2, 1)`.
//!
//! Degenerate rotations are not special-cased; only non-finite input is
//! rejected.

use std::f64::consts::PI;

use log::debug;
use nalgebra::{Matrix3, Vector3};

use super::{CameraPoseCandidate, KnownTagAnchors, TagDetection};
use crate::reporting::LocalizerError;

/// Remap a position from detector axes to world axes
pub fn detector_to_world(p: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(p.x, -p.z, -p.y)
}

/// Reorder the rotation columns as (0, 2, 1), without negation
pub fn permute_rotation(rotation: &Matrix3<f64>) -> Matrix3<f64> {
    Matrix3::from_columns(&[rotation.column(0), rotation.column(2), rotation.column(1)])
}

/// Heading of a detector rotation, in (-π, π]
pub fn yaw_from_rotation(rotation: &Matrix3<f64>) -> f64 {
    let permuted = permute_rotation(rotation);
    normalize_angle(permuted[(1, 0)].atan2(permuted[(0, 0)]))
}

/// Fold an angle into (-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Converts detector output into camera pose candidates
#[derive(Debug, Clone)]
pub struct TagPoseTransformer {
    anchors: KnownTagAnchors,
}

impl TagPoseTransformer {
    pub fn new(anchors: KnownTagAnchors) -> Self {
        Self { anchors }
    }

    /// Camera pose implied by one detection
    ///
    /// Returns `Ok(None)` when the tag has no known anchor, and a
    /// `Transform` error when the detection contains non-finite values.
    pub fn transform(
        &self,
        detection: &TagDetection,
    ) -> Result<Option<CameraPoseCandidate>, LocalizerError> {
        let Some(anchor) = self.anchors.get(detection.tag_id) else {
            debug!("Ignoring tag {} (no known anchor)", detection.tag_id);
            return Ok(None);
        };

        if !detection.rotation.iter().all(|v| v.is_finite()) {
            return Err(LocalizerError::Transform {
                tag_id: detection.tag_id,
                reason: "rotation matrix contains non-finite values".to_string(),
            });
        }
        if !detection.translation.iter().all(|v| v.is_finite()) {
            return Err(LocalizerError::Transform {
                tag_id: detection.tag_id,
                reason: "translation vector contains non-finite values".to_string(),
            });
        }

        let camera_in_detector_axes =
            anchor - detection.rotation.transpose() * detection.translation;
        let position = detector_to_world(&camera_in_detector_axes);
        let yaw = yaw_from_rotation(&detection.rotation);

        Ok(Some(CameraPoseCandidate {
            tag_id: detection.tag_id,
            position,
            yaw,
        }))
    }

    /// Transform every detection of a frame
    ///
    /// Unknown tags are skipped silently. Malformed detections are returned as
    /// errors and do not affect the other candidates.
    pub fn transform_all(
        &self,
        detections: &[TagDetection],
    ) -> (Vec<CameraPoseCandidate>, Vec<LocalizerError>) {
        let mut candidates = Vec::with_capacity(detections.len());
        let mut errors = Vec::new();

        for detection in detections {
            match self.transform(detection) {
                Ok(Some(candidate)) => candidates.push(candidate),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        (candidates, errors)
    }
}
