// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error reporting
//!
//! Every failure met by the processing loops goes through an [`ErrorReporter`].
//! Reports are observational only: the reporter logs them, counts them per
//! category and hands the report back, but never changes the caller's control
//! flow.
//!
//! Log lines follow the `[category] code: message` layout, for example:
//!
//! ```text
//! [acquisition] 0x02-0x03: Frame acquisition failed: camera timeout
//! ```

pub mod error;
pub mod sink;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};

pub use error::{ErrorCategory, LocalizerError};
pub use sink::{LogSink, MemorySink, PoseRecord, RecordSink};

/// A classified failure, as handed to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&LocalizerError> for ErrorReport {
    fn from(err: &LocalizerError) -> Self {
        Self {
            category: err.category(),
            code: err.code().to_string(),
            message: err.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Logs and counts failures per category
///
/// The reporter is shared between the producer, link and receive loops
/// behind an `Arc`; counters are lock-free.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    counts: [AtomicU64; 6],
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a failure and return its structured form
    pub fn report(&self, err: &LocalizerError) -> ErrorReport {
        let report = ErrorReport::from(err);
        self.counts[report.category.index()].fetch_add(1, Ordering::Relaxed);

        if err.is_warning() {
            warn!("[{}] {}: {}", report.category, report.code, report.message);
        } else {
            error!("[{}] {}: {}", report.category, report.code, report.message);
        }
        report
    }

    /// Report every failure of a batch
    pub fn report_all<'a, I>(&self, errors: I) -> Vec<ErrorReport>
    where
        I: IntoIterator<Item = &'a LocalizerError>,
    {
        errors.into_iter().map(|err| self.report(err)).collect()
    }

    /// Number of failures reported so far in a category
    pub fn count(&self, category: ErrorCategory) -> u64 {
        self.counts[category.index()].load(Ordering::Relaxed)
    }

    /// Number of failures reported so far, all categories
    pub fn total(&self) -> u64 {
        ErrorCategory::ALL.iter().map(|c| self.count(*c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_per_category() {
        let reporter = ErrorReporter::new();
        let read = LocalizerError::TransportRead {
            address: 0,
            count: 9,
            reason: "connection reset".into(),
        };
        let frame = LocalizerError::Acquisition {
            reason: "no frame".into(),
        };

        let report = reporter.report(&read);
        reporter.report_all([&frame, &frame]);

        assert_eq!(report.category, ErrorCategory::Transport);
        assert_eq!(report.code, "0x05-0x01");
        assert!(report.message.contains("connection reset"));
        assert_eq!(reporter.count(ErrorCategory::Transport), 1);
        assert_eq!(reporter.count(ErrorCategory::Acquisition), 2);
        assert_eq!(reporter.count(ErrorCategory::Encoding), 0);
        assert_eq!(reporter.total(), 3);
    }
}
