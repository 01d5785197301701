//! Shared constants for the tcp_estats probe
//!
//! These constants are used by both kernel and userspace programs
//! to ensure consistency in the wire protocol.

// ============================================================================
// Ring Buffers
// ============================================================================

/// Number of statistic categories, one ring buffer each
pub const CATEGORY_COUNT: usize = 7;

// ============================================================================
// Operations (for Entry.op)
// ============================================================================

/// Store the value unconditionally
pub const OPERATION_SET: u32 = 0;

/// Add the value to the current one (wrapping)
pub const OPERATION_ADD: u32 = 1;

/// Subtract the value from the current one (wrapping)
pub const OPERATION_SUB: u32 = 2;

/// Keep the larger of current and value
pub const OPERATION_MAX: u32 = 3;

/// Keep the smaller of current and value
pub const OPERATION_MIN: u32 = 4;
