//! # PCI Express Enumeration
//!
//! Walks the PCI topology through the memory-mapped configuration space
//! (ECAM) windows listed in the ACPI MCFG table, logs every function it
//! finds, and offers each one to the registered drivers.
//!
//! ## Walk
//!
//! ```text
//! MCFG allocation (ECAM base, start bus)
//!     ↓  scan start bus only
//! device 0..32
//!     ↓  function 0 header type: > 1 (or empty slot) → skip device
//!     ↓  multifunction bit → functions 0..8, else function 0
//! function
//!     ↓  vendor 0xFFFF → absent
//!     ↓  read id, interrupt line, class
//! driver dispatch
//!     ↓  class table (class, subclass), then vendor table (vendor, device)
//! PCI-to-PCI bridge driver
//!     ↓  same ECAM base, secondary bus number
//! recursive scan
//! ```
//!
//! ## Configuration Access
//!
//! Configuration space is never kept mapped. Each read goes through a
//! [`ConfigWindow`](config::ConfigWindow) that maps one function's 4 KiB
//! window through the [`MmioMapper`](config::MmioMapper) and unmaps it when
//! dropped, so the walk never holds more than one window at a time.
//!
//! ## Drivers
//!
//! A [`PciDriver`](driver::PciDriver) answers an attach call with
//! [`Attach::Claimed`](driver::Attach::Claimed) (stop matching),
//! [`Attach::Declined`](driver::Attach::Declined) (try the next match) or an
//! [`AttachError`](driver::AttachError), which is logged before matching
//! continues. The built-in class table holds the bridge driver only.
//!
//! Bridges whose secondary bus is not numbered above their own bus are
//! refused, so a mis-programmed bridge cannot send the walk in circles.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod device;
pub mod driver;
pub mod enumerate;
pub mod regs;

pub use config::{ConfigWindow, MmioMapper};
pub use device::{PciBus, PciFunction, class_name};
pub use driver::{Attach, AttachError, BusScanner, DriverEntry, PciDriver};
pub use enumerate::{Enumerator, PciError, ScanSummary, pcie_init};
