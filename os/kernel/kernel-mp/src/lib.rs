//! # Multiprocessor Topology Discovery
//!
//! Builds the processor and interrupt controller inventory from the ACPI
//! MADT. The result is a plain [`Topology`] value owned by the caller; the
//! crate keeps no global state.
//!
//! ## Entry Order
//!
//! Processors are recorded in the order their Local APIC structures appear
//! in the MADT, and the first enabled one is the boot processor (ACPI
//! 5.2.12.1). Disabled entries are skipped. At most
//! [`NCPU`](kernel_info::limits::NCPU) processors are kept; further enabled
//! entries are dropped and only counted.
//!
//! ## I/O APIC
//!
//! The kernel drives a single I/O APIC: the first one whose global system
//! interrupt base is zero. Every other I/O APIC structure is ignored.
//!
//! ## Malformed Tables
//!
//! A structure with a zero or overrunning length ends the walk with a
//! warning. Whatever was recorded before it is kept.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use kernel_acpi::AcpiTables;
//! # fn boot(tables: &AcpiTables<'_>) -> Result<(), kernel_mp::MpError> {
//! let topology = kernel_mp::mp_init(tables)?;
//! let boot = topology.cpus.boot_cpu().expect("at least one CPU");
//! println!("BSP has APIC id {}", boot.apic_id);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod cpu;
mod topology;

pub use cpu::{CpuInfo, CpuList, CpuStatus, OverrideList};
pub use topology::{IoApicInfo, MpError, Topology, discover_topology, mp_init};
