//! Record decoding for raw ring buffer samples.
//!
//! Each sample is one packed [`Entry`](estats_common::Entry): the connection
//! key followed by the operation, the variable ordinal and the operand, all
//! in host byte order.

use crate::endian::{ByteOrder, NATIVE};
use crate::types::ConnectionKey;
use bytes::{Bytes, BytesMut};
use estats_common::constants::{
    OPERATION_ADD, OPERATION_MAX, OPERATION_MIN, OPERATION_SET, OPERATION_SUB,
};
use estats_common::ENTRY_SIZE;
use std::fmt;
use thiserror::Error;

/// Size in bytes of one wire record
pub const RECORD_SIZE: usize = ENTRY_SIZE;

/// Errors that can occur while decoding a sample.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record has {size} bytes, expected {}", RECORD_SIZE)]
    Size { size: usize },

    #[error("unknown operation code: {raw}")]
    UnknownOperation { raw: u32 },
}

/// Merge operation requested by the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Set,
    Add,
    Sub,
    Max,
    Min,
}

impl Operation {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            OPERATION_SET => Some(Operation::Set),
            OPERATION_ADD => Some(Operation::Add),
            OPERATION_SUB => Some(Operation::Sub),
            OPERATION_MAX => Some(Operation::Max),
            OPERATION_MIN => Some(Operation::Min),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Operation::Set => OPERATION_SET,
            Operation::Add => OPERATION_ADD,
            Operation::Sub => OPERATION_SUB,
            Operation::Max => OPERATION_MAX,
            Operation::Min => OPERATION_MIN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Set => "OPERATION_SET",
            Operation::Add => "OPERATION_ADD",
            Operation::Sub => "OPERATION_SUB",
            Operation::Max => "OPERATION_MAX",
            Operation::Min => "OPERATION_MIN",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded statistic update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub key: ConnectionKey,
    pub op: Operation,
    /// Category-relative variable ordinal
    pub var: u32,
    pub val: u32,
}

impl Record {
    /// Decode a sample written in host byte order
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_with(data, NATIVE)
    }

    /// Decode a sample written in the given byte order
    pub fn decode_with(data: &[u8], order: ByteOrder) -> Result<Self, DecodeError> {
        if data.len() != RECORD_SIZE {
            return Err(DecodeError::Size { size: data.len() });
        }

        let mut buf = data;
        let key = ConnectionKey {
            pid_tgid: order.get_u64(&mut buf),
            saddr: order.get_u32(&mut buf),
            daddr: order.get_u32(&mut buf),
            sport: order.get_u16(&mut buf),
            dport: order.get_u16(&mut buf),
        };
        let raw_op = order.get_u32(&mut buf);
        let op = Operation::from_u32(raw_op).ok_or(DecodeError::UnknownOperation { raw: raw_op })?;

        Ok(Record {
            key,
            op,
            var: order.get_u32(&mut buf),
            val: order.get_u32(&mut buf),
        })
    }

    /// Encode into the host byte order wire layout
    pub fn encode(&self) -> Bytes {
        self.encode_with(NATIVE)
    }

    /// Encode into the wire layout using the given byte order
    pub fn encode_with(&self, order: ByteOrder) -> Bytes {
        let mut buf = BytesMut::with_capacity(RECORD_SIZE);
        order.put_u64(&mut buf, self.key.pid_tgid);
        order.put_u32(&mut buf, self.key.saddr);
        order.put_u32(&mut buf, self.key.daddr);
        order.put_u16(&mut buf, self.key.sport);
        order.put_u16(&mut buf, self.key.dport);
        order.put_u32(&mut buf, self.op.as_u32());
        order.put_u32(&mut buf, self.var);
        order.put_u32(&mut buf, self.val);
        buf.freeze()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} on {} with {}", self.key, self.op, self.var, self.val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estats_common::PerfVar;
    use std::net::Ipv4Addr;

    fn record() -> Record {
        Record {
            key: ConnectionKey {
                pid_tgid: 12345,
                saddr: NATIVE.pack_ipv4(Ipv4Addr::new(127, 0, 0, 1)),
                daddr: NATIVE.pack_ipv4(Ipv4Addr::new(239, 192, 0, 1)),
                sport: 8080,
                dport: 1248,
            },
            op: Operation::Min,
            var: PerfVar::DataOctetsIn as u32,
            val: 42,
        }
    }

    #[test]
    fn test_decode_round_trip() {
        let rec = record();
        let raw = rec.encode();

        assert_eq!(raw.len(), RECORD_SIZE);
        assert_eq!(Record::decode(&raw), Ok(rec));
    }

    #[test]
    fn test_decode_field_layout() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&7u64.to_ne_bytes());
        raw.extend_from_slice(&1u32.to_ne_bytes());
        raw.extend_from_slice(&2u32.to_ne_bytes());
        raw.extend_from_slice(&3u16.to_ne_bytes());
        raw.extend_from_slice(&4u16.to_ne_bytes());
        raw.extend_from_slice(&OPERATION_SUB.to_ne_bytes());
        raw.extend_from_slice(&5u32.to_ne_bytes());
        raw.extend_from_slice(&6u32.to_ne_bytes());

        let rec = Record::decode(&raw).unwrap();
        assert_eq!(rec.key.pid_tgid, 7);
        assert_eq!(rec.key.saddr, 1);
        assert_eq!(rec.key.daddr, 2);
        assert_eq!(rec.key.sport, 3);
        assert_eq!(rec.key.dport, 4);
        assert_eq!(rec.op, Operation::Sub);
        assert_eq!(rec.var, 5);
        assert_eq!(rec.val, 6);
    }

    #[test]
    fn test_decode_honors_byte_order() {
        let rec = record();
        let raw = rec.encode_with(ByteOrder::Big);
        assert_eq!(Record::decode_with(&raw, ByteOrder::Big), Ok(rec));
        assert_eq!(&raw[..8], &12345u64.to_be_bytes());
    }

    #[test]
    fn test_decode_wrong_size() {
        let raw = record().encode();

        assert_eq!(
            Record::decode(&raw[..RECORD_SIZE - 1]),
            Err(DecodeError::Size { size: RECORD_SIZE - 1 })
        );

        let mut long = raw.to_vec();
        long.extend_from_slice(&[0u8; 8]);
        assert_eq!(Record::decode(&long), Err(DecodeError::Size { size: 40 }));
        assert_eq!(Record::decode(&[]), Err(DecodeError::Size { size: 0 }));
    }

    #[test]
    fn test_decode_unknown_operation() {
        let mut raw = record().encode().to_vec();
        raw[20..24].copy_from_slice(&9u32.to_ne_bytes());

        assert_eq!(
            Record::decode(&raw),
            Err(DecodeError::UnknownOperation { raw: 9 })
        );
    }

    #[test]
    fn test_record_display() {
        assert_eq!(
            record().to_string(),
            "[P: 12345, S: 127.0.0.1:8080, D: 239.192.0.1:1248]: OPERATION_MIN on 7 with 42"
        );
    }
}
