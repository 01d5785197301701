//! Shared types for the tcp_estats probe
//!
//! This crate provides the wire layout, operation codes and statistic
//! enumerations shared between the eBPF tracing programs and the userspace
//! aggregator. Both sides must agree on every ordinal declared here.

#![no_std]

pub mod constants;
pub mod types;
pub mod vars;

// Re-export commonly used types
pub use constants::*;
pub use types::{Entry, EntryKey, ENTRY_SIZE};
pub use vars::{AppVar, Category, ConnectionVar, ExtrasVar, GlobalVar, PathVar, PerfVar, StackVar};
