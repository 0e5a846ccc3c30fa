// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register store shared by the pose producer and the Modbus server
//!
//! The store holds a fixed range of holding registers and coils, all
//! initialized to zero. Every multi-register read or write happens under a
//! single lock acquisition, so a reader observes either the previous block or
//! the next one, never a mix of the two.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error};
use tokio_modbus::prelude::ExceptionCode;

/// Raw register maps
#[derive(Debug, Default)]
pub struct RegisterStore {
    holding_registers: HashMap<u16, u16>,
    coils: HashMap<u16, bool>,
}

impl RegisterStore {
    /// Create a store with `capacity` zeroed holding registers and coils
    pub fn new(capacity: u16) -> Self {
        Self {
            holding_registers: (0..capacity).map(|addr| (addr, 0)).collect(),
            coils: (0..capacity).map(|addr| (addr, false)).collect(),
        }
    }
}

/// Cloneable handle on a guarded [`RegisterStore`]
#[derive(Debug, Clone)]
pub struct RegisterBank {
    inner: Arc<Mutex<RegisterStore>>,
}

impl RegisterBank {
    pub fn new(capacity: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegisterStore::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegisterStore> {
        // Registers are plain words: a panic elsewhere cannot leave them invalid.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read_holding_registers(&self, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        register_read(&self.lock().holding_registers, addr, cnt)
    }

    /// Write a whole block atomically
    pub fn write_holding_registers(&self, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        register_write(&mut self.lock().holding_registers, addr, values)
    }

    pub fn read_coils(&self, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
        register_read(&self.lock().coils, addr, cnt)
    }

    pub fn write_coils(&self, addr: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        register_write(&mut self.lock().coils, addr, values)
    }

    /// Read a coil and clear it in the same critical section
    pub fn take_coil(&self, addr: u16) -> Result<bool, ExceptionCode> {
        let mut store = self.lock();
        match store.coils.get_mut(&addr) {
            Some(coil) => Ok(std::mem::replace(coil, false)),
            None => {
                error!("Exception::IllegalDataAddress - Coil {} not found", addr);
                Err(ExceptionCode::IllegalDataAddress)
            }
        }
    }
}

/// Read `cnt` consecutive entries starting at `addr`
///
/// Returns `ExceptionCode::IllegalDataAddress` if any address in the range
/// does not exist.
fn register_read<T: Copy + Default>(
    registers: &HashMap<u16, T>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<T>, ExceptionCode> {
    let mut response_values = vec![T::default(); cnt.into()];

    for i in 0..cnt {
        let value = addr
            .checked_add(i)
            .and_then(|reg_addr| registers.get(&reg_addr));
        match value {
            Some(r) => response_values[i as usize] = *r,
            None => {
                error!(
                    "Exception::IllegalDataAddress - Register {} not found",
                    u32::from(addr) + u32::from(i)
                );
                return Err(ExceptionCode::IllegalDataAddress);
            }
        }
    }

    debug!("Successfully read {} registers from address {}", cnt, addr);
    Ok(response_values)
}

/// Write `values` to consecutive entries starting at `addr`
///
/// The whole range is checked before anything is written, so a failed write
/// leaves the registers untouched.
fn register_write<T: Copy>(
    registers: &mut HashMap<u16, T>,
    addr: u16,
    values: &[T],
) -> Result<(), ExceptionCode> {
    let in_range = (0..values.len()).all(|i| {
        u16::try_from(i)
            .ok()
            .and_then(|i| addr.checked_add(i))
            .is_some_and(|reg_addr| registers.contains_key(&reg_addr))
    });
    if !in_range {
        error!(
            "Exception::IllegalDataAddress - Write of {} values at {} out of range",
            values.len(),
            addr
        );
        return Err(ExceptionCode::IllegalDataAddress);
    }

    for (i, value) in values.iter().enumerate() {
        registers.insert(addr + i as u16, *value);
    }

    debug!(
        "Successfully wrote {} values starting at register {}",
        values.len(),
        addr
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_bank_is_zeroed() {
        let bank = RegisterBank::new(100);
        assert_eq!(bank.read_holding_registers(0, 9).unwrap(), vec![0; 9]);
        assert_eq!(bank.read_coils(98, 2).unwrap(), vec![false, false]);
    }

    #[test]
    fn test_out_of_range_access_is_rejected() {
        let bank = RegisterBank::new(10);
        assert_eq!(
            bank.read_holding_registers(8, 3),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            bank.read_holding_registers(u16::MAX, 2),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            bank.write_holding_registers(9, &[1, 2]),
            Err(ExceptionCode::IllegalDataAddress)
        );
        // Nothing was written by the failed request
        assert_eq!(bank.read_holding_registers(9, 1).unwrap(), vec![0]);
    }

    #[test]
    fn test_take_coil_clears_flag() {
        let bank = RegisterBank::new(4);
        bank.write_coils(0, &[true]).unwrap();
        assert!(bank.take_coil(0).unwrap());
        assert!(!bank.take_coil(0).unwrap());
        assert_eq!(bank.take_coil(4), Err(ExceptionCode::IllegalDataAddress));
    }

    #[test]
    fn test_concurrent_reads_never_see_torn_blocks() {
        let bank = RegisterBank::new(16);
        let blocks = [[0x1111u16; 9], [0x2222u16; 9]];
        bank.write_holding_registers(0, &blocks[0]).unwrap();

        let writer = {
            let bank = bank.clone();
            thread::spawn(move || {
                for i in 0..2000 {
                    bank.write_holding_registers(0, &blocks[i % 2]).unwrap();
                }
            })
        };

        for _ in 0..2000 {
            let read = bank.read_holding_registers(0, 9).unwrap();
            assert!(
                read == blocks[0] || read == blocks[1],
                "torn block observed: {read:x?}"
            );
        }
        writer.join().unwrap();
    }
}
