// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cadence of the periodic loops

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Pose production loop, 200 ms by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub interval_ms: u64,
    /// `null` retries forever
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
}

impl ProducerConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.interval_ms),
            self.max_consecutive_failures,
        )
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            max_consecutive_failures: None,
        }
    }
}

/// Acknowledgement link, 3 s by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Run the link monitor on the register owner side
    pub enabled: bool,

    pub interval_ms: u64,

    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,

    /// Intervals without a fresh flag before the link is reported stale
    #[serde(default = "default_stale_after")]
    pub stale_after: u32,
}

fn default_stale_after() -> u32 {
    3
}

impl LinkConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.interval_ms),
            self.max_consecutive_failures,
        )
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 3000,
            max_consecutive_failures: None,
            stale_after: default_stale_after(),
        }
    }
}
