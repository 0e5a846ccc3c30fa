// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scaled-integer register layout (two's complement)
//!
//! | Offset | Content | Unit |
//! |--------|---------|------|
//! | 0 | x | decimetres |
//! | 1 | y | decimetres |
//! | 2 | z | decimetres |
//! | 3-7 | reserved, always 0 | - |
//! | 8 | yaw | whole degrees |
//!
//! Signed values are stored as `value & 0xFFFF`. Values outside the 16-bit
//! signed range are clamped and reported.

use super::{DecodedPose, EncodedBlock, RegisterCodec, RegisterEncoding};
use crate::localization::FusedPose;
use crate::reporting::LocalizerError;

/// Number of registers in a scaled-integer block
pub const SCALED_BLOCK_LEN: usize = 9;
pub const X_OFFSET: usize = 0;
pub const Y_OFFSET: usize = 1;
pub const Z_OFFSET: usize = 2;
pub const YAW_OFFSET: usize = 8;

/// Position scale: metres to decimetres
pub const POSITION_SCALE: f64 = 10.0;

/// Store a signed value in one register, clamping to the i16 range
pub fn encode_word(value: i32) -> u16 {
    let clamped = value.clamp(i16::MIN as i32, i16::MAX as i32);
    (clamped & 0xFFFF) as u16
}

/// Read a signed value back; words from 0x8000 up are negative
pub fn decode_word(word: u16) -> i16 {
    word as i16
}

/// Round a real value to a register integer
///
/// Non-finite input yields 0, out-of-range input is clamped; both come with
/// an `Encoding` error for the reporter.
pub fn quantize(field: &'static str, value: f64) -> (i32, Option<LocalizerError>) {
    if !value.is_finite() {
        return (
            0,
            Some(LocalizerError::Encoding {
                field,
                value,
                reason: "non-finite value written as 0".to_string(),
            }),
        );
    }

    let rounded = value.round();
    let min = i16::MIN as f64;
    let max = i16::MAX as f64;
    if rounded < min || rounded > max {
        let clamped = rounded.clamp(min, max);
        return (
            clamped as i32,
            Some(LocalizerError::Encoding {
                field,
                value,
                reason: format!("clamped to {}", clamped),
            }),
        );
    }

    (rounded as i32, None)
}

/// Mode A codec: decimetres and whole degrees in single registers
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaledIntegerCodec;

impl ScaledIntegerCodec {
    /// Integer values written for a pose: (x, y, z) in decimetres and yaw in degrees
    pub fn quantize_pose(pose: &FusedPose) -> ([i32; 4], Vec<LocalizerError>) {
        let inputs = [
            ("x", pose.position.x * POSITION_SCALE),
            ("y", pose.position.y * POSITION_SCALE),
            ("z", pose.position.z * POSITION_SCALE),
            ("yaw", pose.yaw_degrees()),
        ];

        let mut values = [0i32; 4];
        let mut issues = Vec::new();
        for (slot, (field, raw)) in values.iter_mut().zip(inputs) {
            let (value, issue) = quantize(field, raw);
            *slot = value;
            issues.extend(issue);
        }
        (values, issues)
    }
}

impl RegisterCodec for ScaledIntegerCodec {
    fn encoding(&self) -> RegisterEncoding {
        RegisterEncoding::ScaledInteger
    }

    fn encode(&self, pose: &FusedPose) -> EncodedBlock {
        let ([x, y, z, yaw], issues) = Self::quantize_pose(pose);

        let mut words = vec![0u16; SCALED_BLOCK_LEN];
        words[X_OFFSET] = encode_word(x);
        words[Y_OFFSET] = encode_word(y);
        words[Z_OFFSET] = encode_word(z);
        words[YAW_OFFSET] = encode_word(yaw);

        EncodedBlock { words, issues }
    }

    fn decode(&self, words: &[u16]) -> Result<DecodedPose, LocalizerError> {
        if words.len() != SCALED_BLOCK_LEN {
            return Err(LocalizerError::BlockLength {
                expected: SCALED_BLOCK_LEN,
                actual: words.len(),
            });
        }

        let metres = |offset: usize| f64::from(decode_word(words[offset])) / POSITION_SCALE;
        Ok(DecodedPose {
            x: metres(X_OFFSET),
            y: metres(Y_OFFSET),
            z: metres(Z_OFFSET),
            yaw: Some(f64::from(decode_word(words[YAW_OFFSET])).to_radians()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_twos_complement_round_trip_over_full_range() {
        for v in i16::MIN as i32..=i16::MAX as i32 {
            assert_eq!(i32::from(decode_word(encode_word(v))), v);
        }
    }

    #[test]
    fn test_minus_one_is_all_ones() {
        assert_eq!(encode_word(-1), 0xFFFF);
        assert_eq!(decode_word(0xFFFF), -1);
        assert_eq!(decode_word(0x8000), -32768);
        assert_eq!(decode_word(0x7FFF), 32767);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        assert_eq!(encode_word(32768), 0x7FFF);
        assert_eq!(encode_word(100_000), 0x7FFF);
        assert_eq!(encode_word(-32769), 0x8000);

        let (value, issue) = quantize("x", 40_000.4);
        assert_eq!(value, 32767);
        assert!(matches!(issue, Some(LocalizerError::Encoding { field: "x", .. })));

        let (value, issue) = quantize("yaw", f64::NAN);
        assert_eq!(value, 0);
        assert!(issue.is_some());

        let (value, issue) = quantize("z", f64::NEG_INFINITY);
        assert_eq!(value, 0);
        assert!(issue.is_some());
    }

    #[test]
    fn test_encode_layout() {
        let pose = FusedPose::new(Vector3::new(1.23, -0.5, 0.04), (-90.0f64).to_radians(), 2);

        let block = ScaledIntegerCodec.encode(&pose);

        assert!(block.issues.is_empty());
        assert_eq!(
            block.words,
            vec![12, 0xFFFB, 0, 0, 0, 0, 0, 0, encode_word(-90)]
        );
    }

    #[test]
    fn test_rounding_is_to_nearest() {
        let pose = FusedPose::new(Vector3::new(0.26, -0.26, 0.249), 0.0, 1);
        let ([x, y, z, _], _) = ScaledIntegerCodec::quantize_pose(&pose);
        assert_eq!((x, y, z), (3, -3, 2));
    }

    #[test]
    fn test_decode_restores_units() {
        let words = [12, 0xFFFB, 3, 0, 0, 0, 0, 0, 0xFFA6];
        let decoded = ScaledIntegerCodec.decode(&words).unwrap();
        assert_relative_eq!(decoded.x, 1.2);
        assert_relative_eq!(decoded.y, -0.5);
        assert_relative_eq!(decoded.z, 0.3);
        assert_relative_eq!(decoded.yaw.unwrap().to_degrees(), -90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = ScaledIntegerCodec.decode(&[0; 6]).unwrap_err();
        assert_eq!(
            err,
            LocalizerError::BlockLength {
                expected: 9,
                actual: 6
            }
        );
    }

    #[test]
    fn test_encode_clamps_far_positions_and_reports() {
        let pose = FusedPose::new(Vector3::new(5000.0, 0.0, f64::NAN), 0.0, 1);
        let block = ScaledIntegerCodec.encode(&pose);
        assert_eq!(block.words[X_OFFSET], 0x7FFF);
        assert_eq!(block.words[Z_OFFSET], 0);
        assert_eq!(block.issues.len(), 2);
    }
}
