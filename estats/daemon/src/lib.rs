//! TCP Extended Statistics Userspace Library
//!
//! Provides reusable components for ingesting per-connection TCP statistics
//! streamed by the tcp_estats eBPF programs and exporting them.

pub mod db;
pub mod endian;
pub mod error;
pub mod estats;
pub mod events;
pub mod exporter;
pub mod loader;
pub mod record;
pub mod source;
pub mod table;
pub mod types;

pub use db::{EstatsDb, Snapshot};
pub use error::EstatsError;
pub use estats::Estats;
pub use events::{ingest_loop, EventProcessor, IngestStats};
pub use exporter::{ExporterType, JsonExporter, SnapshotExporter, TextExporter};
pub use loader::ProbeLoader;
pub use record::{Operation, Record};
pub use source::{ChannelSource, RecordSource, RingBufSource, SourceError};
pub use types::*;
