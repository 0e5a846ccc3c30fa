// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Record sinks for the consumer side
//!
//! Each decoded pose or receive failure becomes a [`PoseRecord`] appended to a
//! [`RecordSink`]. The default [`LogSink`] emits one JSON line per record
//! through the logger.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::ErrorReport;
use crate::codec::DecodedPose;

/// One entry of the consumer log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoseRecord {
    Pose {
        x: f64,
        y: f64,
        z: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        yaw_degrees: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    Error {
        code: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Round to the millimetre, as the consumer log does
fn millimetres(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl PoseRecord {
    pub fn pose(decoded: &DecodedPose) -> Self {
        PoseRecord::Pose {
            x: millimetres(decoded.x),
            y: millimetres(decoded.y),
            z: millimetres(decoded.z),
            yaw_degrees: decoded.yaw.map(f64::to_degrees),
            timestamp: Utc::now(),
        }
    }

    pub fn error(report: &ErrorReport) -> Self {
        PoseRecord::Error {
            code: report.code.clone(),
            message: report.message.clone(),
            timestamp: report.timestamp,
        }
    }
}

/// Destination of consumer records
pub trait RecordSink: Send + Sync {
    fn append(&self, record: PoseRecord);
}

/// Writes every record as a JSON line at `info` level
#[derive(Debug, Default)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn append(&self, record: PoseRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => info!("{}", line),
            Err(e) => log::error!("Failed to serialize pose record: {}", e),
        }
    }
}

/// Keeps records in memory, for embedding applications and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<PoseRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all records appended so far
    pub fn records(&self) -> Vec<PoseRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RecordSink for MemorySink {
    fn append(&self, record: PoseRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_record_serializes_with_type_tag() {
        let record = PoseRecord::pose(&DecodedPose {
            x: 0.12345,
            y: -1.0,
            z: 0.5,
            yaw: None,
        });
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "pose");
        assert_eq!(json["x"], 0.123);
        assert!(json.get("yaw_degrees").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let report = ErrorReport {
            category: crate::reporting::ErrorCategory::Transport,
            code: "0x05-0x01".into(),
            message: "read failed".into(),
            timestamp: Utc::now(),
        };
        sink.append(PoseRecord::error(&report));
        sink.append(PoseRecord::pose(&DecodedPose {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            yaw: Some(std::f64::consts::FRAC_PI_2),
        }));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], PoseRecord::Error { ref code, .. } if code == "0x05-0x01"));
        match &records[1] {
            PoseRecord::Pose { yaw_degrees, .. } => {
                assert!((yaw_degrees.unwrap() - 90.0).abs() < 1e-9)
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
