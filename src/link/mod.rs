// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Acknowledgement link
//!
//! A single coil carries a liveness flag between the two sides, on its own
//! cadence and fully decoupled from pose production:
//!
//! - [`AckSender`] sets the flag to `true` every interval.
//! - [`LinkMonitor`] samples and clears the flag every interval on the side
//!   that owns the registers, and tracks whether the peer is still alive.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use log::{debug, info};
use tokio::time;

use crate::registers::RegisterBank;
use crate::reporting::{ErrorReporter, LocalizerError};
use crate::retry::RetryPolicy;
use crate::transport::RegisterTransport;

/// Periodically raises the acknowledgement flag
pub struct AckSender {
    transport: Arc<dyn RegisterTransport>,
    coil: u16,
    reporter: Arc<ErrorReporter>,
}

impl AckSender {
    pub fn new(
        transport: Arc<dyn RegisterTransport>,
        coil: u16,
        reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            transport,
            coil,
            reporter,
        }
    }

    /// Write the flag once; failures are reported and returned
    pub async fn send(&self) -> Result<(), LocalizerError> {
        match self.transport.write_coil(self.coil, true).await {
            Ok(()) => {
                debug!("Acknowledgement sent on coil {}", self.coil);
                Ok(())
            }
            Err(e) => {
                let err = LocalizerError::Acknowledgement {
                    coil: self.coil,
                    reason: e.to_string(),
                };
                self.reporter.report(&err);
                Err(err)
            }
        }
    }

    pub async fn run(self, policy: RetryPolicy, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Acknowledgement sender started on coil {} (every {:?})",
            self.coil, policy.interval
        );
        let mut failures = policy.tracker("Acknowledgement sender");

        while running.load(Ordering::SeqCst) {
            match self.send().await {
                Ok(()) => failures.success(),
                Err(_) => failures.failure()?,
            }
            time::sleep(policy.interval).await;
        }
        Ok(())
    }
}

/// Liveness of the peer as seen through the acknowledgement flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No acknowledgement seen yet
    Unknown,
    Alive,
    Stale,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Unknown => write!(f, "unknown"),
            LinkState::Alive => write!(f, "alive"),
            LinkState::Stale => write!(f, "stale"),
        }
    }
}

/// Samples and clears the acknowledgement flag held in the local register bank
pub struct LinkMonitor {
    registers: RegisterBank,
    coil: u16,
    stale_after: u32,
    missed: u32,
    state: LinkState,
    reporter: Arc<ErrorReporter>,
}

impl LinkMonitor {
    pub fn new(
        registers: RegisterBank,
        coil: u16,
        stale_after: u32,
        reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            registers,
            coil,
            stale_after: stale_after.max(1),
            missed: 0,
            state: LinkState::Unknown,
            reporter,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Take one sample of the flag and update the link state
    ///
    /// A flag that cannot be read is reported and returned; the link state is
    /// left unchanged.
    pub fn sample(&mut self) -> Result<LinkState, LocalizerError> {
        let seen = match self.registers.take_coil(self.coil) {
            Ok(seen) => seen,
            Err(e) => {
                let err = LocalizerError::Acknowledgement {
                    coil: self.coil,
                    reason: e.to_string(),
                };
                self.reporter.report(&err);
                return Err(err);
            }
        };

        if seen {
            if self.state == LinkState::Stale {
                info!(
                    "Acknowledgement link restored on coil {} after {} missed interval(s)",
                    self.coil, self.missed
                );
            } else if self.state == LinkState::Unknown {
                info!("Acknowledgement link up on coil {}", self.coil);
            }
            self.missed = 0;
            self.state = LinkState::Alive;
        } else {
            self.missed = self.missed.saturating_add(1);
            debug!(
                "No acknowledgement on coil {} ({} in a row)",
                self.coil, self.missed
            );
            if self.missed >= self.stale_after && self.state != LinkState::Stale {
                self.reporter.report(&LocalizerError::LinkStale {
                    coil: self.coil,
                    missed: self.missed,
                });
                self.state = LinkState::Stale;
            }
        }
        Ok(self.state)
    }

    pub async fn run(mut self, policy: RetryPolicy, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Link monitor started on coil {} (every {:?}, stale after {} interval(s))",
            self.coil, policy.interval, self.stale_after
        );
        let mut failures = policy.tracker("Link monitor");

        while running.load(Ordering::SeqCst) {
            time::sleep(policy.interval).await;
            match self.sample() {
                Ok(_) => failures.success(),
                Err(_) => failures.failure()?,
            }
        }
        Ok(())
    }
}
