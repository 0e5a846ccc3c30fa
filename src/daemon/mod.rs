// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon runs the producer side of the localizer as a set of cooperating
//! background tasks sharing one register bank:
//!
//! * the Modbus TCP server publishing the registers,
//! * the pose production loop writing the pose block,
//! * the link monitor watching the acknowledgement coil,
//! * a heartbeat.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_tag_localizer::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
