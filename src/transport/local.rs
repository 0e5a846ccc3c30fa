// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use async_trait::async_trait;

use super::RegisterTransport;
use crate::registers::RegisterBank;
use crate::reporting::LocalizerError;

/// In-process access to the register bank served by the Modbus server
#[derive(Debug, Clone)]
pub struct LocalRegisterTransport {
    registers: RegisterBank,
}

impl LocalRegisterTransport {
    pub fn new(registers: RegisterBank) -> Self {
        Self { registers }
    }
}

#[async_trait]
impl RegisterTransport for LocalRegisterTransport {
    async fn read_block(&self, address: u16, count: u16) -> Result<Vec<u16>, LocalizerError> {
        self.registers
            .read_holding_registers(address, count)
            .map_err(|e| LocalizerError::TransportRead {
                address,
                count,
                reason: e.to_string(),
            })
    }

    async fn write_block(&self, address: u16, words: &[u16]) -> Result<(), LocalizerError> {
        self.registers
            .write_holding_registers(address, words)
            .map_err(|e| LocalizerError::TransportWrite {
                address,
                reason: e.to_string(),
            })
    }

    async fn read_coil(&self, address: u16) -> Result<bool, LocalizerError> {
        self.registers
            .read_coils(address, 1)
            .map(|coils| coils[0])
            .map_err(|e| LocalizerError::TransportRead {
                address,
                count: 1,
                reason: e.to_string(),
            })
    }

    async fn write_coil(&self, address: u16, value: bool) -> Result<(), LocalizerError> {
        self.registers
            .write_coils(address, &[value])
            .map_err(|e| LocalizerError::TransportWrite {
                address,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_block_written_through_transport_is_visible_in_bank() {
        let bank = RegisterBank::new(20);
        let transport = LocalRegisterTransport::new(bank.clone());

        transport.write_block(4, &[1, 2, 3]).await.unwrap();
        transport.write_coil(0, true).await.unwrap();

        assert_eq!(bank.read_holding_registers(4, 3).unwrap(), vec![1, 2, 3]);
        assert!(transport.read_coil(0).await.unwrap());
        assert_eq!(transport.read_block(3, 5).await.unwrap(), vec![0, 1, 2, 3, 0]);
    }

    #[tokio::test]
    async fn test_out_of_range_maps_to_transport_errors() {
        let transport = LocalRegisterTransport::new(RegisterBank::new(4));

        let read = transport.read_block(2, 6).await.unwrap_err();
        let write = transport.write_block(3, &[0; 6]).await.unwrap_err();

        assert_eq!(read.code(), "0x05-0x01");
        assert_eq!(write.code(), "0x05-0x02");
        assert!(matches!(
            transport.read_coil(9).await,
            Err(LocalizerError::TransportRead { address: 9, .. })
        ));
    }
}
