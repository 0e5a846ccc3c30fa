// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated camera and tag detector
//!
//! The detector synthesizes, for a configured ground-truth camera pose, the
//! detections a real detector would report for every visible known tag.
//! A tag is visible when its centre projects inside the frame through the
//! camera intrinsics and lens distortion, and when it spans at least
//! [`MIN_TAG_EDGE_PIXELS`] at that distance.

use std::f64::consts::PI;

use chrono::Utc;
use log::debug;
use nalgebra::{Matrix3, Vector3};
use rand::Rng;

use super::{Frame, FrameSource, TagDetector, MAX_FRAME_DIMENSION};
use crate::config::{AcquisitionConfig, CameraConfig};
use crate::localization::{KnownTagAnchors, TagDetection, TagId};
use crate::reporting::LocalizerError;

/// Frame source producing blank frames, with optional random dropouts
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    dropout_probability: f64,
    sequence: u64,
}

impl SimulatedCamera {
    pub fn new(acquisition: &AcquisitionConfig, camera: &CameraConfig) -> Self {
        Self {
            width: camera.width,
            height: camera.height,
            dropout_probability: if acquisition.dropout_probability.is_nan() {
                0.0
            } else {
                acquisition.dropout_probability.clamp(0.0, 1.0)
            },
            sequence: 0,
        }
    }
}

impl FrameSource for SimulatedCamera {
    fn next_frame(&mut self) -> Result<Frame, LocalizerError> {
        self.sequence += 1;

        if self.dropout_probability > 0.0 && rand::rng().random_bool(self.dropout_probability) {
            return Err(LocalizerError::Acquisition {
                reason: format!("simulated dropout on frame {}", self.sequence),
            });
        }

        let pixel_count = Some((self.width, self.height))
            .filter(|(w, h)| *w <= MAX_FRAME_DIMENSION && *h <= MAX_FRAME_DIMENSION)
            .and_then(|(w, h)| Frame::pixel_count(w, h))
            .ok_or_else(|| LocalizerError::Acquisition {
                reason: format!(
                    "unsupported frame size {}x{} (at most {} pixels per edge)",
                    self.width, self.height, MAX_FRAME_DIMENSION
                ),
            })?;

        Ok(Frame {
            sequence: self.sequence,
            captured_at: Utc::now(),
            width: self.width,
            height: self.height,
            pixels: vec![0; pixel_count],
        })
    }
}

/// Rotation about the detector Z axis
fn rotation_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Detection of the tag anchored at `anchor` seen from a camera at world
/// `position` with heading `yaw` (radians)
///
/// This is the exact inverse of the per-tag transform: feeding the result to
/// [`TagPoseTransformer`](crate::localization::TagPoseTransformer) yields
/// `position` and `yaw` back.
pub fn detection_for(
    tag_id: TagId,
    anchor: &Vector3<f64>,
    position: &Vector3<f64>,
    yaw: f64,
) -> TagDetection {
    let rotation = rotation_z(yaw);
    let camera_in_detector_axes = Vector3::new(position.x, -position.z, -position.y);
    let translation = rotation * (anchor - camera_in_detector_axes);
    TagDetection::new(tag_id, rotation, translation)
}

/// One zero-mean normal sample (Box-Muller)
fn gaussian<R: Rng + ?Sized>(rng: &mut R, stddev: f64) -> f64 {
    if stddev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    stddev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Smallest tag edge, in pixels, a detector can still decode
pub const MIN_TAG_EDGE_PIXELS: f64 = 8.0;

/// Point on the normalized image plane, `None` for points in the camera plane
///
/// Depth is the distance along the camera Z axis regardless of its sign.
fn normalize(point: &Vector3<f64>) -> Option<(f64, f64)> {
    let depth = point.z.abs();
    if depth < 1e-9 {
        return None;
    }
    Some((point.x / depth, point.y / depth))
}

/// Pixel position of a point given in camera coordinates, with radial and
/// tangential distortion (k1, k2, p1, p2, k3)
pub fn project(camera: &CameraConfig, point: &Vector3<f64>) -> Option<(f64, f64)> {
    let (x, y) = normalize(point)?;
    let [k1, k2, p1, p2, k3] = camera.distortion;

    let r2 = x * x + y * y;
    let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
    let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
    let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

    Some((camera.fx * xd + camera.cx, camera.fy * yd + camera.cy))
}

/// Detector reporting every visible known tag for a fixed camera pose
pub struct SimulatedTagDetector {
    anchors: KnownTagAnchors,
    camera: CameraConfig,
    tag_size: f64,
    position: Vector3<f64>,
    yaw: f64,
    noise_stddev: f64,
    visible_tags: Vec<TagId>,
}

impl SimulatedTagDetector {
    pub fn new(
        acquisition: &AcquisitionConfig,
        camera: &CameraConfig,
        tag_size: f64,
        anchors: KnownTagAnchors,
    ) -> Self {
        let visible_tags = if acquisition.visible_tags.is_empty() {
            anchors.ids()
        } else {
            acquisition
                .visible_tags
                .iter()
                .copied()
                .filter(|id| anchors.contains(*id))
                .collect()
        };

        Self {
            anchors,
            camera: camera.clone(),
            tag_size,
            position: Vector3::new(acquisition.x, acquisition.y, acquisition.z),
            yaw: acquisition.yaw_degrees.to_radians(),
            noise_stddev: acquisition.noise_stddev,
            visible_tags,
        }
    }

    pub fn visible_tags(&self) -> &[TagId] {
        &self.visible_tags
    }

    /// Whether a tag at `translation` (camera coordinates) shows up in a
    /// `width` x `height` frame
    ///
    /// Both the ideal and the distorted projections must land in the frame:
    /// the polynomial distortion folds back far outside the field of view.
    fn in_view(&self, translation: &Vector3<f64>, width: u32, height: u32) -> bool {
        let distance = translation.norm();
        if distance <= 0.0 || self.camera.fx * self.tag_size / distance < MIN_TAG_EDGE_PIXELS {
            return false;
        }
        let inside = |(u, v): (f64, f64)| {
            (0.0..f64::from(width)).contains(&u) && (0.0..f64::from(height)).contains(&v)
        };
        let ideal = normalize(translation)
            .map(|(x, y)| (self.camera.fx * x + self.camera.cx, self.camera.fy * y + self.camera.cy));

        ideal.is_some_and(inside) && project(&self.camera, translation).is_some_and(inside)
    }
}

impl TagDetector for SimulatedTagDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<TagDetection>, LocalizerError> {
        if Frame::pixel_count(frame.width, frame.height) != Some(frame.pixels.len()) {
            return Err(LocalizerError::Detection {
                reason: format!(
                    "frame {} has {} pixels, expected {}x{}",
                    frame.sequence,
                    frame.pixels.len(),
                    frame.width,
                    frame.height
                ),
            });
        }

        let mut rng = rand::rng();
        let detections: Vec<TagDetection> = self
            .visible_tags
            .iter()
            .filter_map(|id| self.anchors.get(*id).map(|anchor| (*id, anchor)))
            .map(|(id, anchor)| detection_for(id, anchor, &self.position, self.yaw))
            .filter(|detection| self.in_view(&detection.translation, frame.width, frame.height))
            .map(|mut detection| {
                for v in detection.translation.iter_mut() {
                    *v += gaussian(&mut rng, self.noise_stddev);
                }
                detection
            })
            .collect();

        debug!(
            "Simulated frame {}: {} detection(s)",
            frame.sequence,
            detections.len()
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::TagPoseTransformer;
    use approx::assert_relative_eq;

    fn anchors() -> KnownTagAnchors {
        KnownTagAnchors::new()
            .with_anchor(0, Vector3::new(0.0, 0.0, 0.0))
            .with_anchor(1, Vector3::new(0.4, 0.0, 0.0))
            .with_anchor(2, Vector3::new(0.8, 0.0, 0.0))
    }

    fn acquisition() -> AcquisitionConfig {
        AcquisitionConfig {
            x: 0.3,
            y: -2.0,
            z: 0.25,
            yaw_degrees: 30.0,
            noise_stddev: 0.0,
            dropout_probability: 0.0,
            ..AcquisitionConfig::default()
        }
    }

    fn camera() -> CameraConfig {
        CameraConfig::default()
    }

    fn detector(config: &AcquisitionConfig) -> SimulatedTagDetector {
        SimulatedTagDetector::new(config, &camera(), 0.162, anchors())
    }

    fn frame() -> Frame {
        Frame {
            sequence: 1,
            captured_at: Utc::now(),
            width: 1280,
            height: 720,
            pixels: vec![0; 1280 * 720],
        }
    }

    #[test]
    fn test_detection_inverts_transform() {
        let transformer = TagPoseTransformer::new(anchors());
        let position = Vector3::new(0.5, 1.5, -0.2);

        for id in [0, 1, 2] {
            let anchor = *anchors().get(id).unwrap();
            let detection = detection_for(id, &anchor, &position, -2.0);
            let candidate = transformer.transform(&detection).unwrap().unwrap();

            assert_relative_eq!(candidate.position, position, epsilon = 1e-12);
            assert_relative_eq!(candidate.yaw, -2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_detector_reports_every_known_tag_by_default() {
        let detections = detector(&acquisition()).detect(&frame()).unwrap();

        let ids: Vec<TagId> = detections.iter().map(|d| d.tag_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_visible_tags_filter_ignores_unknown_ids() {
        let config = AcquisitionConfig {
            visible_tags: vec![2, 7],
            ..acquisition()
        };
        assert_eq!(detector(&config).visible_tags(), &[2]);
    }

    #[test]
    fn test_noisy_detections_stay_close() {
        let config = AcquisitionConfig {
            noise_stddev: 0.001,
            ..acquisition()
        };
        let clean = detector(&acquisition()).detect(&frame()).unwrap();
        let noisy = detector(&config).detect(&frame()).unwrap();

        assert_eq!(clean.len(), noisy.len());
        for (a, b) in clean.iter().zip(noisy.iter()) {
            assert_eq!(a.rotation, b.rotation);
            assert!((a.translation - b.translation).norm() < 0.05);
        }
    }

    #[test]
    fn test_malformed_frame_is_a_detection_error() {
        let mut bad = frame();
        bad.pixels.truncate(3);

        let err = detector(&acquisition()).detect(&bad).unwrap_err();
        assert_eq!(err.code(), "0x03-0x01");
    }

    #[test]
    fn test_camera_dropouts() {
        let camera_config = CameraConfig {
            width: 8,
            height: 8,
            ..CameraConfig::default()
        };
        let always = AcquisitionConfig {
            dropout_probability: 1.0,
            ..acquisition()
        };
        let never = acquisition();

        let mut failing = SimulatedCamera::new(&always, &camera_config);
        let mut working = SimulatedCamera::new(&never, &camera_config);

        let err = failing.next_frame().unwrap_err();
        assert_eq!(err.code(), "0x02-0x03");

        let first = working.next_frame().unwrap();
        let second = working.next_frame().unwrap();
        assert_eq!(first.pixels.len(), 64);
        assert_eq!(second.sequence, first.sequence + 1);
    }

    #[test]
    fn test_oversized_frame_is_an_acquisition_error() {
        let camera_config = CameraConfig {
            width: 70_000,
            height: 70_000,
            ..CameraConfig::default()
        };
        let mut camera = SimulatedCamera::new(&acquisition(), &camera_config);

        let err = camera.next_frame().unwrap_err();
        assert_eq!(err.code(), "0x02-0x03");
        assert!(err.to_string().contains("70000x70000"));
    }

    #[test]
    fn test_projection_of_optical_axis_is_principal_point() {
        let (u, v) = project(&camera(), &Vector3::new(0.0, 0.0, -2.0)).unwrap();
        assert_relative_eq!(u, 647.95);
        assert_relative_eq!(v, 328.6);
        assert!(project(&camera(), &Vector3::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_tags_outside_the_frame_are_not_detected() {
        // Slide the camera along the row of tags until only the last one is in view
        let config = AcquisitionConfig {
            x: 1.6,
            yaw_degrees: 0.0,
            ..acquisition()
        };
        let detections = detector(&config).detect(&frame()).unwrap();

        let ids: Vec<TagId> = detections.iter().map(|d| d.tag_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_distant_tags_are_too_small_to_detect() {
        let config = AcquisitionConfig {
            x: 0.4,
            y: -40.0,
            z: 0.0,
            yaw_degrees: 0.0,
            ..acquisition()
        };
        assert!(detector(&config).detect(&frame()).unwrap().is_empty());

        let close = AcquisitionConfig { y: -20.0, ..config };
        assert_eq!(detector(&close).detect(&frame()).unwrap().len(), 3);
    }
}
