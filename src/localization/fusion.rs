// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Multi-tag fusion
//!
//! All candidates of a frame contribute equally. Positions are averaged
//! component-wise. Yaws are averaged either arithmetically (the historical
//! behaviour, wrong for headings straddling ±π) or on the unit circle.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::transform::normalize_angle;
use super::{CameraPoseCandidate, FusedPose};

/// Yaw averaging strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YawAveraging {
    /// Plain mean of the angles
    #[default]
    Arithmetic,
    /// Direction of the mean unit vector
    Circular,
}

/// Combines the candidates of one frame into a single pose
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseFuser {
    yaw_averaging: YawAveraging,
}

impl PoseFuser {
    pub fn new(yaw_averaging: YawAveraging) -> Self {
        Self { yaw_averaging }
    }

    /// Fuse the candidates of a frame
    ///
    /// Returns `None` when there is nothing to fuse: an empty frame never
    /// produces a pose at the origin.
    pub fn fuse(&self, candidates: &[CameraPoseCandidate]) -> Option<FusedPose> {
        if candidates.is_empty() {
            return None;
        }

        let n = candidates.len() as f64;
        let position = candidates
            .iter()
            .fold(Vector3::zeros(), |acc, c| acc + c.position)
            / n;

        let yaw = match self.yaw_averaging {
            YawAveraging::Arithmetic => candidates.iter().map(|c| c.yaw).sum::<f64>() / n,
            YawAveraging::Circular => {
                let (sin, cos) = candidates
                    .iter()
                    .fold((0.0, 0.0), |(s, c), cand| (s + cand.yaw.sin(), c + cand.yaw.cos()));
                normalize_angle(sin.atan2(cos))
            }
        };

        Some(FusedPose::new(position, yaw, candidates.len()))
    }
}
