//! Wire structures shared between kernel and userspace
//!
//! Entries are packed: the userspace decoder reads them field by field in
//! declaration order, each field in host byte order, with no padding.

/// Connection identity as captured by the tracing programs
#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct EntryKey {
    /// `bpf_get_current_pid_tgid()` of the task that touched the socket
    pub pid_tgid: u64,
    /// Local IPv4 address (`skc_rcv_saddr`, raw network bytes)
    pub saddr: u32,
    /// Remote IPv4 address (`skc_daddr`, raw network bytes)
    pub daddr: u32,
    /// Local port (host byte order)
    pub sport: u16,
    /// Remote port (host byte order)
    pub dport: u16,
}

/// One statistic update submitted to a category ring buffer
#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct Entry {
    /// Connection identifier
    pub key: EntryKey,
    /// Merge operation (see OPERATION_* constants)
    pub op: u32,
    /// Category-relative variable ordinal
    pub var: u32,
    /// Operand
    pub val: u32,
}

/// Size in bytes of one wire entry
pub const ENTRY_SIZE: usize = core::mem::size_of::<Entry>();

// Layout checks, fail to compile if the wire size drifts
const _: () = {
    assert!(core::mem::size_of::<EntryKey>() == 20);
    assert!(ENTRY_SIZE == 32);
};
