// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus/TCP client transport
//!
//! One TCP context is shared by every loop of the consumer; requests are
//! serialized through an async mutex and each one is bounded by the
//! configured timeout. After a timeout or a transport error the connection
//! is replaced: a late reply left in the stream would otherwise be matched
//! against the next request.

use std::fmt::Display;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::{error::Elapsed, timeout};
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use super::RegisterTransport;
use crate::reporting::LocalizerError;

/// Register transport over a Modbus/TCP connection
pub struct ModbusClientTransport {
    ctx: Mutex<Context>,
    socket_addr: SocketAddr,
    timeout: Duration,
}

async fn open(socket_addr: SocketAddr, limit: Duration) -> Result<Context> {
    timeout(limit, tcp::connect(socket_addr))
        .await
        .with_context(|| format!("Timed out connecting to {}", socket_addr))?
        .with_context(|| format!("Failed to connect to Modbus server at {}", socket_addr))
}

impl ModbusClientTransport {
    /// Connect to a Modbus server
    ///
    /// A failed connection is returned as an error: there is nothing to retry
    /// against at startup.
    pub async fn connect(socket_addr: SocketAddr, timeout: Duration) -> Result<Self> {
        info!("Connecting to Modbus server at {}", socket_addr);
        let ctx = open(socket_addr, timeout).await?;
        info!("Connected to Modbus server {}", socket_addr);

        Ok(Self {
            ctx: Mutex::new(ctx),
            socket_addr,
            timeout,
        })
    }

    /// Flatten the timeout / transport / exception layers of one request
    /// into a single message, reconnecting when the stream is out of step
    async fn settle<T, E1, E2>(
        &self,
        ctx: &mut Context,
        outcome: Result<Result<Result<T, E2>, E1>, Elapsed>,
    ) -> Result<T, String>
    where
        E1: Display,
        E2: Display,
    {
        let reason = match outcome {
            Ok(Ok(Ok(value))) => return Ok(value),
            Ok(Ok(Err(exception))) => return Err(format!("exception: {}", exception)),
            Ok(Err(transport)) => transport.to_string(),
            Err(_) => format!("no response within {:?}", self.timeout),
        };

        match open(self.socket_addr, self.timeout).await {
            Ok(fresh) => {
                warn!("Reconnected to {} after: {}", self.socket_addr, reason);
                *ctx = fresh;
            }
            Err(e) => warn!("Reconnection to {} failed: {:#}", self.socket_addr, e),
        }
        Err(reason)
    }
}

#[async_trait]
impl RegisterTransport for ModbusClientTransport {
    async fn read_block(&self, address: u16, count: u16) -> Result<Vec<u16>, LocalizerError> {
        let mut ctx = self.ctx.lock().await;
        let outcome = timeout(self.timeout, ctx.read_holding_registers(address, count)).await;
        self.settle(&mut ctx, outcome)
            .await
            .map_err(|reason| LocalizerError::TransportRead {
                address,
                count,
                reason,
            })
    }

    async fn write_block(&self, address: u16, words: &[u16]) -> Result<(), LocalizerError> {
        let mut ctx = self.ctx.lock().await;
        let outcome = timeout(self.timeout, ctx.write_multiple_registers(address, words)).await;
        self.settle(&mut ctx, outcome)
            .await
            .map_err(|reason| LocalizerError::TransportWrite { address, reason })
    }

    async fn read_coil(&self, address: u16) -> Result<bool, LocalizerError> {
        let mut ctx = self.ctx.lock().await;
        let outcome = timeout(self.timeout, ctx.read_coils(address, 1)).await;
        let coils = self
            .settle(&mut ctx, outcome)
            .await
            .map_err(|reason| LocalizerError::TransportRead {
                address,
                count: 1,
                reason,
            })?;
        coils
            .first()
            .copied()
            .ok_or_else(|| LocalizerError::TransportRead {
                address,
                count: 1,
                reason: "empty coil response".to_string(),
            })
    }

    async fn write_coil(&self, address: u16, value: bool) -> Result<(), LocalizerError> {
        let mut ctx = self.ctx.lock().await;
        let outcome = timeout(self.timeout, ctx.write_single_coil(address, value)).await;
        self.settle(&mut ctx, outcome)
            .await
            .map_err(|reason| LocalizerError::TransportWrite { address, reason })
    }
}
