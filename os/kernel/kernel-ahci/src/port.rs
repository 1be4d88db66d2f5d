//! # Port Bring-Up and Command Issue
//!
//! A port moves through a small state machine:
//!
//! ```text
//!   Idle ──reset──▶ Resetting ──engines restarted──▶ Running
//!                                                   │    ▲
//!                                             issue │    │ CI and BSY clear
//!                                                   ▼    │
//!                                             CommandInFlight
//! ```
//!
//! A failed reset returns the port to `Idle`. A command that times out leaves
//! it in `CommandInFlight` until the next reset.

use crate::command::{CMD_FIS_DWORDS, CommandFlags, PortPage, PrdEntry};
use crate::error::AhciError;
use crate::fis::{FIS_REG_H2D_LEN, FisRegH2d};
use crate::io::{DmaMemory, HbaIo, PortRegs};
use crate::regs::{PX_CI, PX_CLB, PX_CLBU, PX_FB, PX_FBU, PX_SERR};
use core::ptr::NonNull;
use core::sync::atomic::{Ordering, fence};
use kernel_info::addr::PhysicalAddress;
use kernel_info::poll::{PollBound, spin_until};

/// Lifecycle of one port.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PortState {
    #[default]
    Idle,
    Resetting,
    Running,
    CommandInFlight,
}

/// Data phase of a command.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Transfer {
    None,
    /// Device to memory.
    In { va: usize, len: usize },
    /// Memory to device.
    Out { va: usize, len: usize },
}

/// One port's registers, DMA page and polling budget.
pub(crate) struct Port<'h, R: ?Sized> {
    index: u8,
    regs: PortRegs<'h, R>,
    page: NonNull<PortPage>,
    poll: PollBound,
}

impl<'h, R: HbaIo + ?Sized> Port<'h, R> {
    pub(crate) fn new(hba: &'h R, index: u8, page: NonNull<PortPage>, poll: PollBound) -> Self {
        Self {
            index,
            regs: PortRegs::new(hba, index),
            page,
            poll,
        }
    }

    /// Stops the port's engines, points it at its DMA page and restarts it.
    ///
    /// Returns `Ok(false)` without touching the port when nothing is attached.
    pub(crate) fn reset<D: DmaMemory + ?Sized>(
        &self,
        dma: &D,
        state: &mut PortState,
    ) -> Result<bool, AhciError> {
        if self.regs.ssts().is_empty() {
            return Ok(false);
        }
        *state = PortState::Resetting;

        let cmd = self.regs.cmd().with_st(false);
        self.regs.set_cmd(cmd);
        self.regs.set_cmd(cmd.with_fre(false));
        if let Err(e) = self.wait(|| !self.regs.cmd().engines_running()) {
            *state = PortState::Idle;
            return Err(e);
        }

        let page = self.page.as_ptr();
        // SAFETY: `page` points into the caller's `PortPages`, borrowed
        // mutably for the driver's lifetime; the engines are stopped.
        let (rfis, cmdh, cmdt) = unsafe {
            (
                (&raw const (*page).rfis).expose_provenance(),
                (&raw const (*page).cmdh).expose_provenance(),
                (&raw const (*page).cmdt).expose_provenance(),
            )
        };
        let rfis = self.phys(dma, rfis)?;
        let cmdh_pa = self.phys(dma, cmdh)?;
        let cmdt_pa = self.phys(dma, cmdt)?;

        // SAFETY: as above.
        unsafe {
            let header = &raw mut (*page).cmdh[0];
            let mut h = header.read_volatile();
            h.set_table_address(cmdt_pa);
            header.write_volatile(h);
        }
        self.regs.write_address(PX_CLB, PX_CLBU, cmdh_pa);
        self.regs.write_address(PX_FB, PX_FBU, rfis);

        self.regs.write(PX_SERR, u32::MAX);
        self.regs.write(PX_SERR, 0);

        let cmd = self.regs.cmd().with_fre(true);
        self.regs.set_cmd(cmd);
        self.regs.set_cmd(cmd.with_st(true));

        *state = PortState::Running;
        Ok(true)
    }

    /// Issues `fis` in slot 0 and waits for completion.
    ///
    /// Returns the byte count the HBA reports as transferred.
    pub(crate) fn issue<D: DmaMemory + ?Sized>(
        &self,
        dma: &D,
        state: &mut PortState,
        fis: &FisRegH2d,
        transfer: Transfer,
    ) -> Result<u32, AhciError> {
        if *state != PortState::Running {
            return Err(AhciError::NotRunning {
                port: self.index,
                state: *state,
            });
        }

        let (prd, write, prdbc) = match transfer {
            Transfer::None => (None, false, 0),
            Transfer::In { va, len } => (Some(self.prd(dma, va, len)?), false, 0),
            Transfer::Out { va, len } => {
                #[allow(clippy::cast_possible_truncation)]
                let bytes = len as u32;
                (Some(self.prd(dma, va, len)?), true, bytes)
            }
        };

        let mut cfis = [0u8; 0x40];
        cfis[..FIS_REG_H2D_LEN].copy_from_slice(&fis.to_bytes());

        let page = self.page.as_ptr();
        // SAFETY: the port is idle (CI clear), so the HBA is not reading the
        // command list or table while they are rewritten.
        unsafe {
            (&raw mut (*page).cmdt.cfis).write_volatile(cfis);
            if let Some(prd) = prd {
                (&raw mut (*page).cmdt.prdt[0]).write_volatile(prd);
            }
            let header = &raw mut (*page).cmdh[0];
            let mut h = header.read_volatile();
            h.flags = CommandFlags::new()
                .with_cfl(CMD_FIS_DWORDS)
                .with_write(write);
            h.prdtl = u16::from(prd.is_some());
            h.prdbc = prdbc;
            header.write_volatile(h);
        }
        fence(Ordering::SeqCst);

        *state = PortState::CommandInFlight;
        self.regs.write(PX_CI, 1);
        self.wait(|| !self.regs.status().bsy() && self.regs.ci() & 1 == 0)?;
        fence(Ordering::SeqCst);
        *state = PortState::Running;

        let tfd = self.regs.tfd();
        if tfd.status().failed() {
            return Err(AhciError::TaskFile {
                port: self.index,
                status: tfd.status().into_bits(),
                error: tfd.error(),
            });
        }

        // SAFETY: the command has completed; the HBA is done with the header.
        Ok(unsafe { (&raw const (*page).cmdh[0].prdbc).read_volatile() })
    }

    fn wait(&self, cond: impl FnMut() -> bool) -> Result<(), AhciError> {
        spin_until(self.poll, cond).map_err(|t| AhciError::Timeout {
            port: self.index,
            spins: t.spins,
        })
    }

    /// PRD entry for `len` bytes at `va`; DBA bit 0 is reserved and the byte
    /// count must be even.
    fn prd<D: DmaMemory + ?Sized>(
        &self,
        dma: &D,
        va: usize,
        len: usize,
    ) -> Result<PrdEntry, AhciError> {
        let pa = self.phys(dma, va)?;
        if !pa.is_aligned(2) || len % 2 != 0 {
            return Err(AhciError::Misaligned {
                port: self.index,
                pa,
                len,
            });
        }
        Ok(PrdEntry::new(pa, len))
    }

    fn phys<D: DmaMemory + ?Sized>(
        &self,
        dma: &D,
        va: usize,
    ) -> Result<PhysicalAddress, AhciError> {
        dma.virt_to_phys(va).ok_or(AhciError::NotDmaReachable {
            port: self.index,
            va,
        })
    }
}
