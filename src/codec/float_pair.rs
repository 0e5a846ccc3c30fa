// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! IEEE-754 float register layout
//!
//! Each coordinate is narrowed to `f32`, serialized big-endian and split into
//! a high word (first two bytes) and a low word (last two bytes):
//!
//! | Offset | Content |
//! |--------|---------|
//! | 0, 1 | x (high, low), metres |
//! | 2, 3 | y (high, low), metres |
//! | 4, 5 | z (high, low), metres |

use super::{DecodedPose, EncodedBlock, RegisterCodec, RegisterEncoding};
use crate::localization::FusedPose;
use crate::reporting::LocalizerError;

/// Number of registers in a float block
pub const FLOAT_BLOCK_LEN: usize = 6;

/// Split a float into its (high, low) register pair
pub fn f32_to_words(value: f32) -> [u16; 2] {
    let b = value.to_be_bytes();
    [u16::from_be_bytes([b[0], b[1]]), u16::from_be_bytes([b[2], b[3]])]
}

/// Rebuild a float from its (high, low) register pair
///
/// Every bit pattern is a valid IEEE-754 value, so this never fails.
pub fn words_to_f32(high: u16, low: u16) -> f32 {
    let bits = (u32::from(high) << 16) | u32::from(low);
    f32::from_be_bytes(bits.to_be_bytes())
}

/// Narrow a coordinate to `f32`
///
/// NaN is kept (its bit pattern is legal on the wire); infinities and values
/// beyond the `f32` range are clamped to `±f32::MAX`. Both are reported.
pub fn narrow(field: &'static str, value: f64) -> (f32, Option<LocalizerError>) {
    if value.is_nan() {
        return (
            f32::NAN,
            Some(LocalizerError::Encoding {
                field,
                value,
                reason: "NaN written as-is".to_string(),
            }),
        );
    }

    let max = f64::from(f32::MAX);
    if value.abs() > max {
        let clamped = value.clamp(-max, max) as f32;
        return (
            clamped,
            Some(LocalizerError::Encoding {
                field,
                value,
                reason: format!("clamped to {:e}", clamped),
            }),
        );
    }

    (value as f32, None)
}

/// Mode B codec: three big-endian floats over six registers
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatPairCodec;

impl RegisterCodec for FloatPairCodec {
    fn encoding(&self) -> RegisterEncoding {
        RegisterEncoding::FloatPair
    }

    fn encode(&self, pose: &FusedPose) -> EncodedBlock {
        let mut words = Vec::with_capacity(FLOAT_BLOCK_LEN);
        let mut issues = Vec::new();

        for (field, value) in [
            ("x", pose.position.x),
            ("y", pose.position.y),
            ("z", pose.position.z),
        ] {
            let (narrowed, issue) = narrow(field, value);
            words.extend_from_slice(&f32_to_words(narrowed));
            issues.extend(issue);
        }

        EncodedBlock { words, issues }
    }

    fn decode(&self, words: &[u16]) -> Result<DecodedPose, LocalizerError> {
        if words.len() != FLOAT_BLOCK_LEN {
            return Err(LocalizerError::BlockLength {
                expected: FLOAT_BLOCK_LEN,
                actual: words.len(),
            });
        }

        let value = |i: usize| f64::from(words_to_f32(words[2 * i], words[2 * i + 1]));
        Ok(DecodedPose {
            x: value(0),
            y: value(1),
            z: value(2),
            yaw: None,
        })
    }
}
