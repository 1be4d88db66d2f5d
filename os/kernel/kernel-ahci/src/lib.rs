//! # AHCI Disk Driver
//!
//! A minimal, polling-only driver for one SATA disk behind an AHCI host bus
//! adapter. It brings up the first implemented port with a working device,
//! identifies the disk and serves sector reads and writes of at most one
//! 4 KiB block per command.
//!
//! ## Overview
//!
//! The driver never takes interrupts and never queues: exactly one command
//! slot (slot 0) with exactly one PRD entry is used, and every command is
//! issued and then busy-waited to completion. That is enough for a boot-time
//! root disk and keeps the DMA footprint to one page per port.
//!
//! ## Modules
//!
//! ### Registers ([`regs`])
//! * **[`HbaMemory`](regs::HbaMemory)** / **[`PortRegisters`](regs::PortRegisters)**:
//!   `#[repr(C)]` layouts from which every register offset is derived
//! * **Bitfields**: [`Ghc`](regs::Ghc), [`PortCmd`](regs::PortCmd),
//!   [`TaskFileData`](regs::TaskFileData), [`SataStatus`](regs::SataStatus)
//!
//! ### DMA Structures ([`command`])
//! * **[`PortPage`](command::PortPage)**: received-FIS area, command list and
//!   the slot-0 command table, packed into one 4 KiB page
//! * **[`PortPages`](command::PortPages)**: one page per possible port,
//!   provided by the caller
//!
//! ### Commands ([`fis`], [`identify`])
//! * **[`FisRegH2d`](fis::FisRegH2d)**: IDENTIFY, READ/WRITE DMA EXT and
//!   FLUSH CACHE
//! * **[`IdentifyDevice`](identify::IdentifyDevice)**: capacity and the
//!   byte-swapped model/serial/firmware strings
//!
//! ### Driver
//! * **[`Ahci`]**: controller context; see [`PortState`] for the per-port
//!   state machine
//!
//! ## Hardware Access
//!
//! Register access goes through [`HbaIo`] and address translation through
//! [`DmaMemory`]. On real hardware [`MmioHba`] performs volatile accesses on
//! the pre-mapped window; host tests substitute a simulated controller.
//!
//! ## Command Sequence
//!
//! ```text
//! write CFIS + PRD + header (W bit, PRDTL, PRDBC)
//!          │ fence
//!          ▼
//!     PxCI |= 1 ──▶ spin while PxTFD.BSY || PxCI[0]
//!                              │ fence
//!                              ▼
//!                 PxTFD.ERR / DF ? ──▶ AhciError::TaskFile
//! ```
//!
//! ## Safety
//!
//! The crate is `#![allow(unsafe_code)]`: DMA structures are written with
//! volatile stores through raw pointers into the caller-provided
//! [`PortPages`], and [`MmioHba`] dereferences the register window.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod command;
mod driver;
mod error;
pub mod fis;
pub mod identify;
mod io;
mod port;
pub mod regs;

pub use command::PortPages;
pub use driver::{Ahci, DiskInfo};
pub use error::AhciError;
pub use io::{DmaMemory, HbaIo, MmioHba};
pub use port::PortState;
