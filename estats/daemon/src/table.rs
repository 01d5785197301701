//! Per-category statistic tables
//!
//! A table maps a category-relative variable ordinal to its current value.
//! Variables are created lazily, and one that was never written reads as
//! zero. Every merge operation starts from that zero, so `MIN` on a fresh
//! variable always stores 0.

use crate::error::EstatsError;
use crate::record::Operation;
use crate::types::{Category, TableValues};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Merge `val` into `current` according to `op`
///
/// `ADD` and `SUB` wrap on overflow.
pub fn merge(op: Operation, current: u32, val: u32) -> u32 {
    match op {
        Operation::Set => val,
        Operation::Add => current.wrapping_add(val),
        Operation::Sub => current.wrapping_sub(val),
        Operation::Max => current.max(val),
        Operation::Min => current.min(val),
    }
}

/// Lockable variable table for one category of one connection
#[derive(Debug)]
pub struct StatTable {
    category: Category,
    values: RwLock<HashMap<u32, u32>>,
}

impl StatTable {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Apply a merge operation to a variable
    ///
    /// The table's write lock is held for the read-modify-write, so
    /// concurrent applies on the same table never lose an update.
    ///
    /// # Returns
    ///
    /// The stored value after the merge, or `UnknownVariable` when `var`
    /// does not name a variable of this table's category.
    pub fn apply(&self, op: Operation, var: u32, val: u32) -> Result<u32, EstatsError> {
        if self.category.var_name(var).is_none() {
            return Err(EstatsError::UnknownVariable {
                category: self.category,
                var,
            });
        }

        let mut values = self.values.write();
        let slot = values.entry(var).or_insert(0);
        *slot = merge(op, *slot, val);
        Ok(*slot)
    }

    /// Current value of a variable, zero if never written
    pub fn get(&self, var: u32) -> u32 {
        self.values.read().get(&var).copied().unwrap_or(0)
    }

    /// Number of variables written so far
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the table keyed by variable name
    pub fn snapshot(&self) -> TableValues {
        let values = self.values.read();
        values
            .iter()
            .filter_map(|(var, val)| {
                self.category
                    .var_name(*var)
                    .map(|name| (name.to_string(), *val))
            })
            .collect()
    }
}
