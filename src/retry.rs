// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Loop cadence and failure budget shared by the periodic tasks

use std::time::Duration;

use anyhow::{bail, Result};

/// Cadence of a periodic loop and how many consecutive failures it tolerates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between iterations, whatever their outcome
    pub interval: Duration,
    /// `None` retries forever
    pub max_consecutive_failures: Option<u32>,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_consecutive_failures: Option<u32>) -> Self {
        Self {
            interval,
            max_consecutive_failures,
        }
    }

    /// Retry forever at the given cadence
    pub fn forever(interval: Duration) -> Self {
        Self::new(interval, None)
    }

    pub fn tracker(&self, task: &'static str) -> FailureTracker {
        FailureTracker {
            task,
            limit: self.max_consecutive_failures,
            consecutive: 0,
        }
    }
}

/// Counts consecutive failures of one loop against its policy
#[derive(Debug, Clone)]
pub struct FailureTracker {
    task: &'static str,
    limit: Option<u32>,
    consecutive: u32,
}

impl FailureTracker {
    pub fn success(&mut self) {
        self.consecutive = 0;
    }

    /// Record a failed iteration; errors once the limit is reached
    pub fn failure(&mut self) -> Result<()> {
        self.consecutive = self.consecutive.saturating_add(1);
        match self.limit {
            Some(limit) if self.consecutive >= limit => bail!(
                "{} gave up after {} consecutive failures",
                self.task,
                self.consecutive
            ),
            _ => Ok(()),
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}
