// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server implementation for the tag localizer
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! ## Register Map
//!
//! ### Holding Registers (Read/Write)
//!
//! The pose block starts at the configured base address (0 by default):
//!
//! | Encoding | Offsets | Content |
//! |----------|---------|---------|
//! | `scaled_integer` | 0, 1, 2 | x, y, z in decimetres, two's complement |
//! | `scaled_integer` | 3-7 | reserved, always 0 |
//! | `scaled_integer` | 8 | yaw in whole degrees, two's complement |
//! | `float_pair` | 0-5 | x, y, z as big-endian `f32`, high word first |
//!
//! ### Coils (Read/Write)
//!
//! | Coil | Description |
//! |------|-------------|
//! | 0 | Acknowledgement flag, set by the client, cleared by the link monitor |

use std::future;

use log::{debug, error};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::registers::RegisterBank;

/// A Modbus TCP service exposing the localizer register bank.
///
/// Every connection gets its own service instance, all of them sharing the
/// same [`RegisterBank`], so a pose written by the producer is visible to every
/// client and an acknowledgement written by any client is seen by the link
/// monitor.
///
/// Supported function codes:
/// - 0x01: Read Coils
/// - 0x03: Read Holding Registers
/// - 0x05: Write Single Coil
/// - 0x06: Write Single Register
/// - 0x0F: Write Multiple Coils
/// - 0x10: Write Multiple Registers
///
/// Any other function code returns an IllegalFunction exception.
#[derive(Debug, Clone)]
pub struct LocalizerModbusServer {
    registers: RegisterBank,
}

impl tokio_modbus::server::Service for LocalizerModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => {
                debug!(
                    "Reading {} holding registers starting from address {}",
                    cnt, addr
                );
                self.registers
                    .read_holding_registers(addr, cnt)
                    .map(Response::ReadHoldingRegisters)
            }
            Request::WriteMultipleRegisters(addr, values) => {
                debug!(
                    "Writing {} values to holding registers starting from address {}",
                    values.len(),
                    addr
                );
                self.registers
                    .write_holding_registers(addr, &values)
                    .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
            }
            Request::WriteSingleRegister(addr, value) => {
                debug!("Writing value {} to holding register {}", value, addr);
                self.registers
                    .write_holding_registers(addr, std::slice::from_ref(&value))
                    .map(|_| Response::WriteSingleRegister(addr, value))
            }
            Request::ReadCoils(addr, cnt) => {
                debug!("Reading {} coils starting from address {}", cnt, addr);
                self.registers
                    .read_coils(addr, cnt)
                    .map(Response::ReadCoils)
            }
            Request::WriteSingleCoil(addr, value) => {
                debug!("Writing {} to coil {}", value, addr);
                self.registers
                    .write_coils(addr, std::slice::from_ref(&value))
                    .map(|_| Response::WriteSingleCoil(addr, value))
            }
            Request::WriteMultipleCoils(addr, values) => {
                debug!(
                    "Writing {} values to coils starting from address {}",
                    values.len(),
                    addr
                );
                self.registers
                    .write_coils(addr, &values)
                    .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16))
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl LocalizerModbusServer {
    /// Create a service instance over a shared register bank
    pub fn new(registers: RegisterBank) -> Self {
        Self { registers }
    }
}

/// Serve the register bank on an already bound listener until the task is aborted
///
/// Binding happens in the caller so that an unusable address fails at
/// startup rather than inside a background task.
pub async fn serve(listener: TcpListener, registers: RegisterBank) -> std::io::Result<()> {
    let server = Server::new(listener);

    let on_connected = move |stream, socket_addr| {
        let registers = registers.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |peer| {
                debug!("Modbus client connected from {}", peer);
                Ok(Some(LocalizerModbusServer::new(registers.clone())))
            })
        }
    };

    let on_process_error = |err| {
        error!("Modbus server error: {err}");
    };

    server.serve(&on_connected, on_process_error).await
}
