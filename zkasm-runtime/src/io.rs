//! I/O boundary
//!
//! Bus transactions leave the function through an [`IoBus`]. A read
//! answering `None` rejects the transaction, which fails the caller.

use std::collections::HashMap;
use std::sync::Mutex;

use num_bigint::BigUint;

use crate::error::{Result, RuntimeError};

pub trait IoBus {
    /// Data lines answered for `address` on `bus`, or `None` when the other
    /// side rejected the request
    fn read(&self, bus: usize, address: &[BigUint]) -> Result<Option<Vec<BigUint>>>;

    fn write(&self, bus: usize, address: &[BigUint], data: &[BigUint]) -> Result<()>;
}

/// Boundary with nothing attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBus;

impl IoBus for NoBus {
    fn read(&self, bus: usize, _address: &[BigUint]) -> Result<Option<Vec<BigUint>>> {
        Err(RuntimeError::UnknownBus { bus })
    }

    fn write(&self, bus: usize, _address: &[BigUint], _data: &[BigUint]) -> Result<()> {
        Err(RuntimeError::UnknownBus { bus })
    }
}

/// A recorded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub bus: usize,
    pub address: Vec<BigUint>,
    pub data: Vec<BigUint>,
}

/// Answers reads from a fixed table and records every write
#[derive(Debug, Default)]
pub struct TableBus {
    table: HashMap<(usize, Vec<BigUint>), Vec<BigUint>>,
    writes: Mutex<Vec<Transaction>>,
}

impl TableBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `data` when `bus` is read at `address`
    pub fn insert(&mut self, bus: usize, address: Vec<BigUint>, data: Vec<BigUint>) {
        self.table.insert((bus, address), data);
    }

    pub fn with(mut self, bus: usize, address: Vec<BigUint>, data: Vec<BigUint>) -> Self {
        self.insert(bus, address, data);
        self
    }

    /// Writes recorded so far, in order
    pub fn writes(&self) -> Vec<Transaction> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl IoBus for TableBus {
    fn read(&self, bus: usize, address: &[BigUint]) -> Result<Option<Vec<BigUint>>> {
        // unknown addresses are outside the table's domain
        Ok(self.table.get(&(bus, address.to_vec())).cloned())
    }

    fn write(&self, bus: usize, address: &[BigUint], data: &[BigUint]) -> Result<()> {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(Transaction {
                bus,
                address: address.to_vec(),
                data: data.to_vec(),
            });
        }
        Ok(())
    }
}
