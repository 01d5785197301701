//! Userspace type definitions
//!
//! Defines the connection identity used to key the store and the data
//! structures produced for export.
//!
//! ## Organization
//!
//! This module separates kernel and userspace types:
//! - **Kernel Types**: Statistic enumerations shared with the tracing
//!   programs (from estats_common)
//! - **Userspace Types**: Types used only in userspace for aggregation and export

use crate::endian::NATIVE;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Kernel Types (from eBPF programs)
// ============================================================================

pub mod kernel {
    //! Types shared between kernel eBPF programs and userspace
    //!
    //! These are re-exported from the estats-common crate and must
    //! maintain binary compatibility with the eBPF programs.

    pub use estats_common::vars::{
        AppVar, Category, ConnectionVar, ExtrasVar, GlobalVar, PathVar, PerfVar, StackVar,
    };
}

// Re-export commonly used kernel types at module level for convenience
pub use kernel::Category;

/// Identity of one monitored flow
///
/// Two records belong to the same aggregate exactly when every field matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionKey {
    /// Process and thread id of the task that touched the socket
    pub pid_tgid: u64,
    /// Local address, raw network bytes packed into a host integer
    pub saddr: u32,
    /// Remote address, raw network bytes packed into a host integer
    pub daddr: u32,
    /// Local port
    pub sport: u16,
    /// Remote port
    pub dport: u16,
}

impl ConnectionKey {
    /// Local endpoint as `ip:port`
    pub fn source(&self) -> String {
        format!("{}:{}", NATIVE.ipv4(self.saddr), self.sport)
    }

    /// Remote endpoint as `ip:port`
    pub fn destination(&self) -> String {
        format!("{}:{}", NATIVE.ipv4(self.daddr), self.dport)
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[P: {}, S: {}, D: {}]",
            self.pid_tgid,
            self.source(),
            self.destination()
        )
    }
}

/// Variable name to value, ordered by name
pub type TableValues = BTreeMap<String, u32>;

/// Every category table of one connection, keyed the way exports name them
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct TablesExport {
    pub global: TableValues,
    pub connection: TableValues,
    pub perf: TableValues,
    pub path: TableValues,
    pub stack: TableValues,
    pub app: TableValues,
    pub extras: TableValues,
}

impl TablesExport {
    /// Table for a category
    pub fn get(&self, category: Category) -> &TableValues {
        match category {
            Category::Global => &self.global,
            Category::Connection => &self.connection,
            Category::Perf => &self.perf,
            Category::Path => &self.path,
            Category::Stack => &self.stack,
            Category::App => &self.app,
            Category::Extras => &self.extras,
        }
    }

    /// Mutable table for a category
    pub fn get_mut(&mut self, category: Category) -> &mut TableValues {
        match category {
            Category::Global => &mut self.global,
            Category::Connection => &mut self.connection,
            Category::Perf => &mut self.perf,
            Category::Path => &mut self.path,
            Category::Stack => &mut self.stack,
            Category::App => &mut self.app,
            Category::Extras => &mut self.extras,
        }
    }
}

/// One connection in the structured export
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionExport {
    /// Source address:port
    pub saddr: String,
    /// Destination address:port
    pub daddr: String,
    /// Per-category statistic tables
    pub tables: TablesExport,
}
