// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register codec
//!
//! Maps a fused pose to a fixed-layout block of 16-bit holding registers and
//! back. Two wire encodings exist and are never mixed within one block:
//!
//! - [`scaled::ScaledIntegerCodec`] (9 words): decimetres and whole degrees,
//!   two's complement
//! - [`float_pair::FloatPairCodec`] (6 words): raw big-endian `f32` split over
//!   register pairs
//!
//! Both sides of the link must use the same encoding and base address.
//! Encoding and decoding are pure. Encoding never fails: values that do not
//! fit are clamped and listed in [`EncodedBlock::issues`].

pub mod float_pair;
pub mod scaled;

use serde::{Deserialize, Serialize};

use crate::localization::FusedPose;
use crate::reporting::LocalizerError;

pub use float_pair::FloatPairCodec;
pub use scaled::ScaledIntegerCodec;

/// Wire encoding of the pose block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterEncoding {
    /// Decimetres / degrees as two's complement words (mode A)
    ScaledInteger,
    /// Big-endian `f32` register pairs (mode B)
    #[default]
    FloatPair,
}

impl RegisterEncoding {
    /// Number of registers in one block
    pub fn block_len(self) -> usize {
        match self {
            RegisterEncoding::ScaledInteger => scaled::SCALED_BLOCK_LEN,
            RegisterEncoding::FloatPair => float_pair::FLOAT_BLOCK_LEN,
        }
    }

    /// Codec implementing this encoding
    pub fn codec(self) -> Box<dyn RegisterCodec> {
        match self {
            RegisterEncoding::ScaledInteger => Box::new(ScaledIntegerCodec),
            RegisterEncoding::FloatPair => Box::new(FloatPairCodec),
        }
    }
}

impl std::str::FromStr for RegisterEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scaled_integer" | "scaled" | "a" => Ok(RegisterEncoding::ScaledInteger),
            "float_pair" | "float" | "b" => Ok(RegisterEncoding::FloatPair),
            other => Err(format!(
                "unknown register encoding '{}', expected scaled_integer or float_pair",
                other
            )),
        }
    }
}

/// Registers produced for one pose, with any clamping that occurred
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBlock {
    pub words: Vec<u16>,
    pub issues: Vec<LocalizerError>,
}

/// Pose read back from a register block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedPose {
    /// Metres
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Radians, present only when the encoding carries a heading
    pub yaw: Option<f64>,
}

/// Bidirectional mapping between a pose and a register block
pub trait RegisterCodec: Send + Sync {
    fn encoding(&self) -> RegisterEncoding;

    fn block_len(&self) -> usize {
        self.encoding().block_len()
    }

    fn encode(&self, pose: &FusedPose) -> EncodedBlock;

    /// Decode a block; fails only when the block length is wrong
    fn decode(&self, words: &[u16]) -> Result<DecodedPose, LocalizerError>;
}
