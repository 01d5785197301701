//! eBPF program loader
//!
//! Handles loading the pre-compiled tcp_estats object, attaching its tracing
//! programs and handing out the per-category ring buffers.

use crate::types::Category;
use anyhow::{Context, Result};
use aya::{
    maps::{MapData, RingBuf},
    programs::{FEntry, FExit, Program},
    Bpf, Btf,
};
use log::{info, warn};
use std::path::Path;

/// Attach point flavour of a tracing program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// Runs on function entry
    FEntry,
    /// Runs on function exit
    FExit,
}

/// A tracing program shipped in the eBPF object
#[derive(Debug, Clone, Copy)]
pub struct TraceProgram {
    /// Program name in the object
    pub name: &'static str,
    pub kind: TraceKind,
    /// Kernel function the program hooks
    pub function: &'static str,
    /// Whether loading fails when this program cannot be attached
    pub required: bool,
}

/// Every tracing program the object may carry
pub const TRACE_PROGRAMS: &[TraceProgram] = &[
    TraceProgram {
        name: "tcp_estats_create_inactive",
        kind: TraceKind::FExit,
        function: "tcp_create_openreq_child",
        required: true,
    },
    TraceProgram {
        name: "tcp_estats_create_active",
        kind: TraceKind::FExit,
        function: "tcp_init_sock",
        required: true,
    },
    TraceProgram {
        name: "tcp_estats_update_segrecv",
        kind: TraceKind::FEntry,
        function: "tcp_v4_do_rcv",
        required: true,
    },
    TraceProgram {
        name: "tcp_estats_update_finish_segrecv",
        kind: TraceKind::FExit,
        function: "tcp_v4_do_rcv",
        required: true,
    },
    TraceProgram {
        name: "tcp_estats_update_segsend",
        kind: TraceKind::FExit,
        function: "__tcp_transmit_skb",
        required: false,
    },
    TraceProgram {
        name: "tcp_event_data_recv",
        kind: TraceKind::FExit,
        function: "tcp_event_data_recv",
        required: false,
    },
    TraceProgram {
        name: "tcp_data_queue_ofo",
        kind: TraceKind::FEntry,
        function: "tcp_data_queue_ofo",
        required: false,
    },
    TraceProgram {
        name: "tcp_rtt_estimator",
        kind: TraceKind::FEntry,
        function: "tcp_rtt_estimator",
        required: false,
    },
];

/// eBPF program loader and manager
pub struct ProbeLoader {
    ebpf: Bpf,
}

impl ProbeLoader {
    /// Load the eBPF object from file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the compiled tcp_estats object
    ///
    /// # Returns
    ///
    /// ProbeLoader instance with loaded eBPF program
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading eBPF object from: {:?}", path);

        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read eBPF object file: {:?}", path))?;
        let ebpf = Bpf::load(&data).context("Failed to load eBPF program")?;

        info!("eBPF program loaded successfully");

        Ok(Self { ebpf })
    }

    /// Initialize eBPF logger
    ///
    /// Forwards aya-log records from the kernel programs to the `log` facade.
    /// Non-fatal if the object was built without aya-log.
    pub fn init_logger(&mut self) {
        if let Err(e) = aya_log::BpfLogger::init(&mut self.ebpf) {
            warn!("eBPF logger not available, kernel-side logs will not be captured: {}", e);
        }
    }

    /// Attach every tracing program in [`TRACE_PROGRAMS`]
    ///
    /// Optional programs that are missing or fail to attach are skipped with a
    /// warning. A required one aborts loading.
    pub fn attach_programs(&mut self) -> Result<()> {
        info!("Attaching tracing programs...");

        let btf = Btf::from_sys_fs().context("Failed to read kernel BTF")?;

        for spec in TRACE_PROGRAMS {
            match self.ebpf.program_mut(spec.name) {
                Some(program) => match attach_one(program, spec, &btf) {
                    Ok(()) => info!("  ✓ Attached {} to {}", spec.name, spec.function),
                    Err(e) if spec.required => return Err(e),
                    Err(e) => warn!("  ⚠ Skipping {} (optional): {:#}", spec.name, e),
                },
                None if spec.required => {
                    anyhow::bail!("{} program not found in eBPF object", spec.name)
                }
                None => warn!("  ⚠ {} program not found (optional)", spec.name),
            }
        }

        info!("Tracing programs attached");

        Ok(())
    }

    /// Take the ring buffer of every category
    ///
    /// # Returns
    ///
    /// One ring buffer per category, in table order
    pub fn take_ring_buffers(&mut self) -> Result<Vec<(Category, RingBuf<MapData>)>> {
        Category::ALL
            .iter()
            .map(|&category| {
                let name = category.map_name();
                let map = self
                    .ebpf
                    .take_map(name)
                    .with_context(|| format!("{} map not found in eBPF object", name))?;
                let ring = RingBuf::try_from(map)
                    .with_context(|| format!("Failed to create RingBuf from {} map", name))?;
                Ok((category, ring))
            })
            .collect()
    }
}

fn attach_one(program: &mut Program, spec: &TraceProgram, btf: &Btf) -> Result<()> {
    match spec.kind {
        TraceKind::FEntry => {
            let program: &mut FEntry = program
                .try_into()
                .with_context(|| format!("Failed to get {} as FEntry", spec.name))?;
            program
                .load(spec.function, btf)
                .with_context(|| format!("Failed to load {}", spec.name))?;
            program
                .attach()
                .with_context(|| format!("Failed to attach {} to {}", spec.name, spec.function))?;
        }
        TraceKind::FExit => {
            let program: &mut FExit = program
                .try_into()
                .with_context(|| format!("Failed to get {} as FExit", spec.name))?;
            program
                .load(spec.function, btf)
                .with_context(|| format!("Failed to load {}", spec.name))?;
            program
                .attach()
                .with_context(|| format!("Failed to attach {} to {}", spec.name, spec.function))?;
        }
    }
    Ok(())
}
