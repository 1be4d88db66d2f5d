//! # Boot-Time Device Discovery
//!
//! The kernel-facing surface of the hardware-discovery layer. It strings the
//! individual discovery crates together in boot order and owns the policy
//! for failures: anything that leaves the kernel without tables, processors,
//! a PCI view or a root disk is fatal and panics with the diagnostic the
//! kernel prints before halting.
//!
//! ## Boot Order
//!
//! ```text
//! acpi_init ──▶ mp_init ──▶ pcie_init ──▶ ahci_init
//!  RSDP/RSDT     MADT        MCFG + ECAM    HBA window
//! ```
//!
//! [`BootDevices::discover`] runs the whole sequence and keeps the results
//! together; the free functions in this crate are the same steps for callers
//! that interleave their own initialisation.
//!
//! ## Fatal Diagnostics
//!
//! | Step        | Condition              | Panic message            |
//! |-------------|------------------------|--------------------------|
//! | `acpi_init` | no RSDP                | `ACPI: No RSDP found`    |
//! | `acpi_init` | bad RSDT/XSDT          | `ACPI: Bad RSDT checksum`, … |
//! | `acpi_init` | more than 32 tables    | `ACPI: more than 32 tables` |
//! | `mp_init`   | no MADT                | `ACPI: No MADT found`    |
//! | `pcie_init` | no MCFG                | `PCIe: MCFG not found!`  |
//! | `ahci_init` | window not mapped      | `AHCI not mapped`        |
//! | `ahci_init` | not the configured window | `AHCI not mapped`     |
//! | `ahci_init` | no usable port         | `Disk not found!`        |
//!
//! Sector I/O after boot ([`ahci_read`], [`ahci_write`]) returns errors
//! instead of panicking.
//!
//! ## Features
//!
//! * `bounded-poll`: [`boot_config`] bounds every hardware busy-wait by
//!   [`DEFAULT_POLL_SPINS`](kernel_info::config::DEFAULT_POLL_SPINS) spins
//!   so a wedged device surfaces as an error instead of a hang.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod boot;
mod config;
pub mod init;

pub use boot::BootDevices;
pub use config::{DEFAULT_POLL, boot_config, hba_window};
pub use init::{acpi_get_table, acpi_init, ahci_init, ahci_read, ahci_write, mp_init, pcie_init};
