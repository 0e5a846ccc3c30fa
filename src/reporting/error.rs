// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Failure taxonomy shared by the acquisition, localization, codec and
//! transport layers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::localization::TagId;

/// Observability category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Camera or frame source unavailable
    Acquisition,
    /// Detector malfunction, the whole frame is skipped
    Detection,
    /// Malformed detection, only the offending tag is dropped
    Transform,
    /// Register read or write failure
    Transport,
    /// Value not representable in the register encoding
    Encoding,
    /// Liveness flag could not be exchanged
    Acknowledgement,
}

impl ErrorCategory {
    /// All categories, in reporting order
    pub const ALL: [ErrorCategory; 6] = [
        ErrorCategory::Acquisition,
        ErrorCategory::Detection,
        ErrorCategory::Transform,
        ErrorCategory::Transport,
        ErrorCategory::Encoding,
        ErrorCategory::Acknowledgement,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            ErrorCategory::Acquisition => 0,
            ErrorCategory::Detection => 1,
            ErrorCategory::Transform => 2,
            ErrorCategory::Transport => 3,
            ErrorCategory::Encoding => 4,
            ErrorCategory::Acknowledgement => 5,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Acquisition => "acquisition",
            ErrorCategory::Detection => "detection",
            ErrorCategory::Transform => "transform",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Encoding => "encoding",
            ErrorCategory::Acknowledgement => "acknowledgement",
        };
        f.write_str(name)
    }
}

/// Errors raised while producing, publishing or consuming a camera pose
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalizerError {
    #[error("Frame source could not be started: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Frame acquisition failed: {reason}")]
    Acquisition { reason: String },

    #[error("Tag detection failed: {reason}")]
    Detection { reason: String },

    #[error("Tag {tag_id} rejected: {reason}")]
    Transform { tag_id: TagId, reason: String },

    #[error("Register read of {count} words at address {address} failed: {reason}")]
    TransportRead {
        address: u16,
        count: u16,
        reason: String,
    },

    #[error("Register write at address {address} failed: {reason}")]
    TransportWrite { address: u16, reason: String },

    #[error("Value {value} for '{field}' is not representable: {reason}")]
    Encoding {
        field: &'static str,
        value: f64,
        reason: String,
    },

    #[error("Register block has {actual} words, expected {expected}")]
    BlockLength { expected: usize, actual: usize },

    #[error("Acknowledgement flag on coil {coil} could not be exchanged: {reason}")]
    Acknowledgement { coil: u16, reason: String },

    #[error("No acknowledgement seen on coil {coil} for {missed} consecutive intervals")]
    LinkStale { coil: u16, missed: u32 },
}

impl LocalizerError {
    /// Category used by the error reporter
    pub fn category(&self) -> ErrorCategory {
        match self {
            LocalizerError::SourceUnavailable { .. } | LocalizerError::Acquisition { .. } => {
                ErrorCategory::Acquisition
            }
            LocalizerError::Detection { .. } => ErrorCategory::Detection,
            LocalizerError::Transform { .. } => ErrorCategory::Transform,
            LocalizerError::TransportRead { .. } | LocalizerError::TransportWrite { .. } => {
                ErrorCategory::Transport
            }
            LocalizerError::Encoding { .. } | LocalizerError::BlockLength { .. } => {
                ErrorCategory::Encoding
            }
            LocalizerError::Acknowledgement { .. } | LocalizerError::LinkStale { .. } => {
                ErrorCategory::Acknowledgement
            }
        }
    }

    /// Short code, `0x<category>-0x<detail>`
    pub fn code(&self) -> &'static str {
        match self {
            LocalizerError::SourceUnavailable { .. } => "0x02-0x02",
            LocalizerError::Acquisition { .. } => "0x02-0x03",
            LocalizerError::Detection { .. } => "0x03-0x01",
            LocalizerError::Transform { .. } => "0x04-0x01",
            LocalizerError::TransportRead { .. } => "0x05-0x01",
            LocalizerError::TransportWrite { .. } => "0x05-0x02",
            LocalizerError::Encoding { .. } => "0x06-0x01",
            LocalizerError::BlockLength { .. } => "0x06-0x02",
            LocalizerError::Acknowledgement { .. } => "0x07-0x01",
            LocalizerError::LinkStale { .. } => "0x07-0x02",
        }
    }

    /// Warnings describe degraded but usable output
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            LocalizerError::Encoding { .. } | LocalizerError::Transform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_grouped_by_category() {
        let errors = [
            LocalizerError::SourceUnavailable {
                reason: "no device".into(),
            },
            LocalizerError::Acquisition {
                reason: "timeout".into(),
            },
            LocalizerError::TransportRead {
                address: 0,
                count: 6,
                reason: "reset".into(),
            },
            LocalizerError::LinkStale { coil: 0, missed: 3 },
        ];

        let prefixes: Vec<&str> = errors.iter().map(|e| &e.code()[..4]).collect();
        assert_eq!(prefixes, vec!["0x02", "0x02", "0x05", "0x07"]);
        assert_eq!(errors[0].category(), ErrorCategory::Acquisition);
        assert_eq!(errors[3].category(), ErrorCategory::Acknowledgement);
    }

    #[test]
    fn test_category_index_matches_all_order() {
        for (i, category) in ErrorCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_display_includes_context() {
        let err = LocalizerError::Encoding {
            field: "x",
            value: 4000.0,
            reason: "clamped to 32767".into(),
        };
        assert_eq!(
            err.to_string(),
            "Value 4000 for 'x' is not representable: clamped to 32767"
        );
        assert!(err.is_warning());
    }
}
