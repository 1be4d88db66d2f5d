//! A simulated AHCI controller.
//!
//! Registers live in a plain array. Writing PxCMD mirrors ST/FRE into CR/FR
//! immediately, and writing PxCI executes slot 0 synchronously against an
//! in-memory disk, following the DMA pointers the driver programmed.
//! Bus addresses are identical to host virtual addresses.

#![allow(dead_code)]

use kernel_ahci::command::{CommandFlags, CommandHeader, CommandTable};
use kernel_ahci::fis::{
    ATA_CMD_FLUSH_CACHE, ATA_CMD_IDENTIFY, ATA_CMD_READ_DMA_EXT, ATA_CMD_WRITE_DMA_EXT, FisRegH2d,
};
use kernel_ahci::regs::{
    HBA_GHC, HBA_PI, HBA_VS, PX_CI, PX_CLB, PX_CLBU, PX_CMD, PX_FB, PX_FBU, PX_SERR, PX_SSTS,
    PX_TFD, PortCmd, port_offset,
};
use kernel_ahci::{DmaMemory, HbaIo};
use kernel_info::addr::PhysicalAddress;
use std::cell::{Cell, RefCell};

pub const SECTOR: usize = 512;
pub const MODEL: &str = "SIMULATED DISK";

/// Task-file value of a healthy idle device: DRDY | DSC.
const TFD_READY: u32 = 0x50;
/// ERR | DRDY with ABRT in the error register.
const TFD_ABORTED: u32 = 0x0451;

/// One command the controller executed.
#[derive(Debug, Copy, Clone)]
pub struct Issued {
    pub port: u8,
    pub command: u8,
    pub lba: u64,
    pub count: u16,
    pub flags: CommandFlags,
    pub prdtl: u16,
    pub prd_len: usize,
    /// PRDBC as the driver left it before issue.
    pub prdbc_before: u32,
}

pub struct SimHba {
    regs: RefCell<Vec<u32>>,
    pub disk: RefCell<Vec<u8>>,
    pub identify: [u16; 256],
    /// Complete every command with ERR set.
    pub fail: Cell<bool>,
    /// CR/FR never clear.
    pub stuck_engines: Cell<bool>,
    /// PxCI is never cleared.
    pub stuck_commands: Cell<bool>,
    pub issued: RefCell<Vec<Issued>>,
    pub cmd_writes: RefCell<Vec<(u8, PortCmd)>>,
    pub serr_writes: RefCell<Vec<(u8, u32)>>,
}

impl SimHba {
    /// A controller implementing `implemented` with disks of `sectors`
    /// sectors behind each port in `attached`.
    pub fn new(implemented: u32, attached: &[u8], sectors: u64) -> Self {
        let sim = Self {
            regs: RefCell::new(vec![0; 0x1100 / 4]),
            disk: RefCell::new(vec![0; sectors as usize * SECTOR]),
            identify: identify_words(sectors, MODEL),
            fail: Cell::new(false),
            stuck_engines: Cell::new(false),
            stuck_commands: Cell::new(false),
            issued: RefCell::new(Vec::new()),
            cmd_writes: RefCell::new(Vec::new()),
            serr_writes: RefCell::new(Vec::new()),
        };
        sim.set(HBA_PI, implemented);
        sim.set(HBA_VS, 0x0001_0301);
        for port in 0..32u8 {
            sim.set_port(port, PX_TFD, TFD_READY);
        }
        for &port in attached {
            sim.set_port(port, PX_SSTS, 0x123);
            // Firmware left the engines running.
            let running = PortCmd::new()
                .with_st(true)
                .with_fre(true)
                .with_cr(true)
                .with_fr(true);
            sim.set_port(port, PX_CMD, running.into_bits());
        }
        sim
    }

    pub fn get(&self, offset: usize) -> u32 {
        self.regs.borrow()[offset / 4]
    }

    pub fn set(&self, offset: usize, value: u32) {
        self.regs.borrow_mut()[offset / 4] = value;
    }

    pub fn port_reg(&self, port: u8, reg: usize) -> u32 {
        self.get(port_offset(usize::from(port)) + reg)
    }

    pub fn set_port(&self, port: u8, reg: usize, value: u32) {
        self.set(port_offset(usize::from(port)) + reg, value);
    }

    pub fn command_list(&self, port: u8) -> u64 {
        u64::from(self.port_reg(port, PX_CLBU)) << 32 | u64::from(self.port_reg(port, PX_CLB))
    }

    pub fn fis_base(&self, port: u8) -> u64 {
        u64::from(self.port_reg(port, PX_FBU)) << 32 | u64::from(self.port_reg(port, PX_FB))
    }

    pub fn ghc(&self) -> u32 {
        self.get(HBA_GHC)
    }

    pub fn sector(&self, lba: usize) -> Vec<u8> {
        self.disk.borrow()[lba * SECTOR..(lba + 1) * SECTOR].to_vec()
    }

    fn execute(&self, port: u8) {
        let clb = std::ptr::with_exposed_provenance_mut::<CommandHeader>(
            self.command_list(port) as usize,
        );
        // SAFETY: the driver programmed PxCLB with the address of a live
        // command list, and identity-maps bus addresses.
        unsafe {
            let header = clb.read_volatile();
            let table = std::ptr::with_exposed_provenance::<CommandTable>(
                header.table_address().as_u64() as usize,
            )
            .read_volatile();
            let fis = FisRegH2d::from_bytes(&table.cfis).expect("register H2D FIS");
            let prd = table.prdt[0];
            let len = if header.prdtl > 0 { prd.len() } else { 0 };
            let buf = std::ptr::with_exposed_provenance_mut::<u8>(prd.address().as_u64() as usize);

            self.issued.borrow_mut().push(Issued {
                port,
                command: fis.command,
                lba: fis.lba48(),
                count: fis.sector_count(),
                flags: header.flags,
                prdtl: header.prdtl,
                prd_len: len,
                prdbc_before: header.prdbc,
            });

            if self.fail.get() {
                self.set_port(port, PX_TFD, TFD_ABORTED);
                return;
            }

            let at = fis.lba48() as usize * SECTOR;
            match fis.command {
                ATA_CMD_IDENTIFY => {
                    let bytes: Vec<u8> =
                        self.identify.iter().flat_map(|w| w.to_le_bytes()).collect();
                    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, len.min(bytes.len()));
                }
                ATA_CMD_READ_DMA_EXT => {
                    let disk = self.disk.borrow();
                    std::ptr::copy_nonoverlapping(disk[at..at + len].as_ptr(), buf, len);
                }
                ATA_CMD_WRITE_DMA_EXT => {
                    let mut disk = self.disk.borrow_mut();
                    std::ptr::copy_nonoverlapping(buf, disk[at..at + len].as_mut_ptr(), len);
                }
                ATA_CMD_FLUSH_CACHE => {}
                other => panic!("unexpected ATA command {other:#x}"),
            }
            (&raw mut (*clb).prdbc).write_volatile(len as u32);
            self.set_port(port, PX_TFD, TFD_READY);
        }
    }
}

impl HbaIo for SimHba {
    fn base(&self) -> usize {
        self.regs.borrow().as_ptr() as usize
    }

    fn read32(&self, offset: usize) -> u32 {
        self.get(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        if offset < port_offset(0) {
            self.set(offset, value);
            return;
        }
        let port = ((offset - port_offset(0)) / 0x80) as u8;
        let reg = (offset - port_offset(0)) % 0x80;
        match reg {
            PX_CMD => {
                let mut cmd = PortCmd::from_bits(value);
                self.cmd_writes.borrow_mut().push((port, cmd));
                if self.stuck_engines.get() {
                    cmd = cmd.with_cr(true).with_fr(true);
                } else {
                    cmd = cmd.with_cr(cmd.st()).with_fr(cmd.fre());
                }
                self.set(offset, cmd.into_bits());
                if !cmd.st() {
                    self.set_port(port, PX_CI, 0);
                }
            }
            PX_SERR => {
                self.serr_writes.borrow_mut().push((port, value));
                self.set(offset, 0);
            }
            PX_CI => {
                self.set(offset, value);
                if value & 1 != 0 && !self.stuck_commands.get() {
                    self.execute(port);
                    self.set(offset, 0);
                }
            }
            _ => self.set(offset, value),
        }
    }
}

/// Identity bus-address translation.
pub struct IdentityDma {
    pub window_mapped: bool,
}

impl IdentityDma {
    pub const MAPPED: Self = Self {
        window_mapped: true,
    };
}

// SAFETY: the simulated controller dereferences bus addresses as host
// pointers.
unsafe impl DmaMemory for IdentityDma {
    fn is_mapped(&self, _va: usize) -> bool {
        self.window_mapped
    }

    fn virt_to_phys(&self, va: usize) -> Option<PhysicalAddress> {
        Some(PhysicalAddress::new(va as u64))
    }
}

/// IDENTIFY data for a disk of `sectors` sectors.
pub fn identify_words(sectors: u64, model: &str) -> [u16; 256] {
    let mut w = [0u16; 256];
    let mut text = [b' '; 40];
    text[..model.len()].copy_from_slice(model.as_bytes());
    for i in 0..20 {
        w[27 + i] = u16::from_be_bytes([text[2 * i], text[2 * i + 1]]);
    }
    let lba28 = sectors.min(0x0FFF_FFFF) as u32;
    w[60] = lba28 as u16;
    w[61] = (lba28 >> 16) as u16;
    for i in 0..4 {
        w[100 + i] = (sectors >> (16 * i)) as u16;
    }
    w
}
