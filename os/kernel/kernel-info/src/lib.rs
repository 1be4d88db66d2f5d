//! # Platform Constants and Discovery Configuration
//!
//! This crate is the single source of truth for the fixed limits, firmware
//! memory regions and tuning knobs shared by the hardware-discovery crates
//! (`kernel-acpi`, `kernel-mp`, `kernel-pci`, `kernel-ahci`) and the boot
//! surface that wires them together (`kernel-devices`).
//!
//! ## Overview
//!
//! Device discovery runs once at boot, before any allocator or scheduler is
//! available. Every table and array it fills is therefore sized at compile
//! time, and every region it scans is a well-known physical address. Keeping
//! those numbers in one place prevents the individual parsers from drifting
//! apart (e.g. the AHCI driver and the block layer disagreeing about the
//! largest transfer a single command may carry).
//!
//! ## Modules
//!
//! ### Addresses ([`addr`])
//! * **[`PhysicalAddress`](addr::PhysicalAddress)**: strongly typed physical
//!   address used for firmware tables, MMIO windows and DMA descriptors
//!
//! ### Firmware Regions ([`platform`])
//! * **EBDA**: the Extended BIOS Data Area pointer in low memory and the
//!   number of bytes of it that are searched for the RSDP
//! * **BIOS ROM**: the `0xE0000..0x100000` window searched as a fallback
//!
//! ### Fixed Limits ([`limits`])
//! * **CPUs**: [`NCPU`](limits::NCPU) entries in the processor inventory
//! * **ACPI**: at most [`ACPI_MAX_TABLES`](limits::ACPI_MAX_TABLES) tables
//! * **AHCI**: 32 ports, 512-byte sectors, one 4 KiB block per command
//!
//! ### Polling ([`poll`])
//! * **[`spin_until`](poll::spin_until)**: the busy-wait primitive every
//!   hardware handshake is built on
//! * **[`PollBound`](poll::PollBound)**: unbounded (the default) or a
//!   finite number of spins
//!
//! ### Configuration ([`config`])
//! * **[`DiscoveryConfig`](config::DiscoveryConfig)**: the few runtime knobs
//!   the boot code hands to the device layer
//!
//! ## Physical Memory Regions
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Real-mode IVT / BIOS data area │
//! 0x0000_040E │  ── EBDA segment pointer (u16)  │
//!             ├─────────────────────────────────┤
//!             │   Conventional memory           │
//!   EBDA      ├─────────────────────────────────┤ segment << 4
//!             │   Extended BIOS Data Area       │ first 1 KiB searched
//!             ├─────────────────────────────────┤
//! 0x000E_0000 │   BIOS ROM                      │ 128 KiB searched
//! 0x0010_0000 └─────────────────────────────────┘
//! ```
//!
//! ## Safety
//!
//! The crate contains only plain data and pure functions and is marked
//! `#![deny(unsafe_code)]`.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_info::limits::{BLOCK_SECTORS, SECTOR_SIZE, BLOCK_SIZE};
//! use kernel_info::poll::{spin_until, PollBound};
//!
//! assert_eq!(BLOCK_SECTORS * SECTOR_SIZE, BLOCK_SIZE);
//!
//! let mut spins = 0;
//! spin_until(PollBound::Unbounded, || {
//!     spins += 1;
//!     spins == 3
//! })
//! .unwrap();
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod addr;
pub mod config;
pub mod limits;
pub mod platform;
pub mod poll;
