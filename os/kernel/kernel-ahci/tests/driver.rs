mod sim;

use kernel_ahci::fis::{
    ATA_CMD_FLUSH_CACHE, ATA_CMD_IDENTIFY, ATA_CMD_READ_DMA_EXT, ATA_CMD_WRITE_DMA_EXT,
    LBA48_SECTORS,
};
use kernel_ahci::regs::{PX_CMD, PortCmd};
use kernel_ahci::{Ahci, AhciError, PortPages, PortState};
use kernel_info::addr::PhysicalAddress;
use kernel_info::poll::PollBound;
use sim::{IdentityDma, MODEL, SECTOR, SimHba, identify_words};

const SECTORS: u64 = 2048;

fn pages() -> Box<PortPages> {
    Box::new(PortPages::new())
}

fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7) ^ seed).collect()
}

#[test]
fn adopts_first_port_with_a_device() {
    let mut pages = pages();
    let sim = SimHba::new(0b0111, &[1, 2], SECTORS);
    let ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();

    let disk = ahci.disk().copied().unwrap();
    assert_eq!(disk.port, 1);
    assert_eq!(disk.sectors, SECTORS);
    assert_eq!(disk.size_bytes(), SECTORS * 512);
    assert_eq!(disk.model.as_str(), MODEL);
    assert_eq!(disk.to_string(), "AHCI.1: 1048576 bytes");

    assert_eq!(ahci.port_state(0), PortState::Idle);
    assert_eq!(ahci.port_state(1), PortState::Running);
    // Probing stops at the adopted port.
    assert_eq!(ahci.port_state(2), PortState::Idle);
    assert_ne!(ahci.hba().ghc() & 1 << 31, 0);

    let issued = ahci.hba().issued.borrow();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].command, ATA_CMD_IDENTIFY);
    assert_eq!(issued[0].count, 1);
    assert_eq!(issued[0].prd_len, SECTOR);
}

#[test]
fn unimplemented_ports_are_not_probed() {
    let mut pages = pages();
    let sim = SimHba::new(0b0100, &[0, 2], SECTORS);
    let ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    assert_eq!(ahci.disk().unwrap().port, 2);
    assert!(ahci.hba().cmd_writes.borrow().iter().all(|&(p, _)| p == 2));
}

#[test]
fn reset_sequence() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::new(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    assert!(ahci.reset_port(0).unwrap());

    let sim = ahci.hba();
    let cmds: Vec<(bool, bool)> = sim
        .cmd_writes
        .borrow()
        .iter()
        .map(|(_, c)| (c.st(), c.fre()))
        .collect();
    assert_eq!(cmds, [(false, true), (false, false), (false, true), (true, true)]);
    assert_eq!(*sim.serr_writes.borrow(), [(0, u32::MAX), (0, 0)]);

    assert_eq!(sim.command_list(0) % 1024, 0);
    assert_eq!(sim.fis_base(0) % 256, 0);
    assert_eq!(sim.command_list(0) - sim.fis_base(0), 0x400);
    let header = ahci.command_header(0).unwrap();
    assert_eq!(header.table_address().as_u64() - sim.command_list(0), 0x400);
}

#[test]
fn reset_is_idempotent() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    let clb = ahci.hba().command_list(0);
    let fb = ahci.hba().fis_base(0);
    let ctba = ahci.command_header(0).unwrap().table_address();

    assert!(ahci.reset_port(0).unwrap());
    assert!(ahci.reset_port(0).unwrap());
    assert_eq!(ahci.hba().command_list(0), clb);
    assert_eq!(ahci.hba().fis_base(0), fb);
    assert_eq!(ahci.command_header(0).unwrap().table_address(), ctba);
    assert_eq!(ahci.port_state(0), PortState::Running);

    let cmd = PortCmd::from_bits(ahci.hba().port_reg(0, PX_CMD));
    assert!(cmd.st());
    assert!(cmd.fre());
    assert!(cmd.engines_running());
}

#[test]
fn empty_port_is_skipped() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[], SECTORS);
    let mut ahci = Ahci::new(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    assert!(!ahci.reset_port(0).unwrap());
    assert!(ahci.hba().cmd_writes.borrow().is_empty());
    assert_eq!(ahci.port_state(0), PortState::Idle);
    assert_eq!(ahci.reset_port(5), Err(AhciError::NoSuchPort { port: 5 }));
}

#[test]
fn write_then_read_back() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();

    let data = pattern(0x5A, 4096);
    ahci.write(100, &data, 8).unwrap();
    assert_eq!(ahci.hba().sector(100), data[..SECTOR]);
    assert_eq!(ahci.hba().sector(107), data[7 * SECTOR..]);

    let mut back = vec![0u8; 4096];
    ahci.read(100, &mut back, 8).unwrap();
    assert_eq!(back, data);

    let mut one = vec![0u8; SECTOR];
    ahci.read(103, &mut one, 1).unwrap();
    assert_eq!(one, data[3 * SECTOR..4 * SECTOR]);
}

#[test]
fn command_header_and_prd_programming() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();

    let data = pattern(1, 4096);
    ahci.write(8, &data, 8).unwrap();
    let mut back = vec![0u8; 4096];
    ahci.read(8, &mut back, 8).unwrap();

    assert_eq!(ahci.prd(0).unwrap().count.dbc(), 8 * 512 - 1);
    let header = ahci.command_header(0).unwrap();
    assert_eq!(header.prdtl, 1);
    assert_eq!(header.flags.cfl(), 5);
    assert_eq!(header.prdbc, 4096);

    let issued = ahci.hba().issued.borrow();
    let write = issued[1];
    assert_eq!(write.command, ATA_CMD_WRITE_DMA_EXT);
    assert!(write.flags.write());
    assert_eq!(write.prdbc_before, 4096);
    assert_eq!((write.lba, write.count), (8, 8));

    // A read after a write must not inherit the write bit.
    let read = issued[2];
    assert_eq!(read.command, ATA_CMD_READ_DMA_EXT);
    assert!(!read.flags.write());
    assert_eq!(read.prdbc_before, 0);
    assert_eq!(read.prd_len, 4096);
}

#[test]
#[should_panic(expected = "exceed one block")]
fn nine_sectors_is_a_precondition_violation() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    let mut buf = vec![0u8; 9 * SECTOR];
    let _ = ahci.read(0, &mut buf, 9);
}

#[test]
fn short_buffer_is_rejected_before_issue() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    let mut buf = vec![0u8; 1000];
    assert_eq!(
        ahci.read(0, &mut buf, 2),
        Err(AhciError::BufferTooSmall { len: 1000, sectors: 2 })
    );
    assert_eq!(ahci.hba().issued.borrow().len(), 1);
    assert_eq!(ahci.read(0, &mut buf, 0), Ok(()));
    assert_eq!(ahci.hba().issued.borrow().len(), 1);
}

#[test]
fn transfers_past_the_last_sector_are_rejected() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    let mut buf = vec![0u8; 4096];

    assert_eq!(
        ahci.read(LBA48_SECTORS | 5, &mut buf, 1),
        Err(AhciError::OutOfRange {
            sector: LBA48_SECTORS | 5,
            count: 1,
            limit: SECTORS
        })
    );
    assert!(matches!(
        ahci.write(SECTORS - 1, &buf, 2),
        Err(AhciError::OutOfRange { .. })
    ));
    assert!(matches!(
        ahci.read(u64::MAX, &mut buf, 1),
        Err(AhciError::OutOfRange { .. })
    ));
    assert_eq!(ahci.hba().issued.borrow().len(), 1);

    ahci.write(SECTORS - 8, &buf, 8).unwrap();
    assert_eq!(ahci.hba().issued.borrow().last().unwrap().lba, SECTORS - 8);
}

#[test]
fn lba48_caps_an_oversized_disk() {
    let mut pages = pages();
    let mut sim = SimHba::new(0b1, &[0], SECTORS);
    sim.identify = identify_words(u64::MAX, MODEL);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    assert_eq!(ahci.disk().unwrap().sectors, u64::MAX);
    assert_eq!(ahci.disk().unwrap().size_bytes(), u64::MAX);

    let mut buf = vec![0u8; SECTOR];
    assert_eq!(
        ahci.read(LBA48_SECTORS, &mut buf, 1),
        Err(AhciError::OutOfRange {
            sector: LBA48_SECTORS,
            count: 1,
            limit: LBA48_SECTORS
        })
    );
    assert_eq!(ahci.hba().issued.borrow().len(), 1);
}

#[test]
fn odd_buffer_address_is_rejected() {
    #[repr(C, align(16))]
    struct Storage([u8; 2 * SECTOR]);

    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    let mut storage = Storage([0; 2 * SECTOR]);
    let pa = PhysicalAddress::new(storage.0[1..].as_ptr() as u64);

    assert_eq!(
        ahci.read(0, &mut storage.0[1..=SECTOR], 1),
        Err(AhciError::Misaligned {
            port: 0,
            pa,
            len: SECTOR
        })
    );
    assert!(matches!(
        ahci.write(0, &storage.0[1..=SECTOR], 1),
        Err(AhciError::Misaligned { .. })
    ));
    assert_eq!(ahci.hba().issued.borrow().len(), 1);
    assert_eq!(ahci.port_state(0), PortState::Running);

    ahci.read(0, &mut storage.0[2..=SECTOR + 1], 1).unwrap();
}

#[test]
fn device_error_is_reported() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    ahci.hba().fail.set(true);

    let mut buf = vec![0u8; SECTOR];
    let err = ahci.read(10, &mut buf, 1).unwrap_err();
    assert_eq!(
        err,
        AhciError::TaskFile {
            port: 0,
            status: 0x51,
            error: 0x04
        }
    );
    assert_eq!(ahci.port_state(0), PortState::Running);

    ahci.hba().fail.set(false);
    ahci.read(1, &mut buf, 1).unwrap();
}

#[test]
fn bounded_poll_times_out_and_reset_recovers() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci =
        Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::spins(1000)).unwrap();
    ahci.hba().stuck_commands.set(true);

    let mut buf = vec![0u8; SECTOR];
    assert_eq!(
        ahci.read(0, &mut buf, 1),
        Err(AhciError::Timeout { port: 0, spins: 1000 })
    );
    assert_eq!(ahci.port_state(0), PortState::CommandInFlight);
    assert!(matches!(
        ahci.read(0, &mut buf, 1),
        Err(AhciError::NotRunning {
            state: PortState::CommandInFlight,
            ..
        })
    ));

    ahci.hba().stuck_commands.set(false);
    assert!(ahci.reset_port(0).unwrap());
    ahci.read(0, &mut buf, 1).unwrap();
}

#[test]
fn engines_that_never_stop_leave_no_disk() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    sim.stuck_engines.set(true);
    let mut ahci = Ahci::new(sim, IdentityDma::MAPPED, &mut pages, PollBound::spins(50)).unwrap();
    assert_eq!(ahci.probe(), Err(AhciError::NoDisk));
    assert_eq!(ahci.port_state(0), PortState::Idle);
}

#[test]
fn no_device_anywhere() {
    let mut pages = pages();
    let sim = SimHba::new(u32::MAX, &[], SECTORS);
    let result = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded);
    assert!(matches!(result, Err(AhciError::NoDisk)));
    assert_eq!(AhciError::NoDisk.to_string(), "Disk not found!");
}

#[test]
fn unmapped_window_is_fatal() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let dma = IdentityDma {
        window_mapped: false,
    };
    let result = Ahci::init(sim, dma, &mut pages, PollBound::Unbounded);
    let Err(err) = result else {
        panic!("expected an error");
    };
    assert!(matches!(err, AhciError::NotMapped { .. }));
    assert_eq!(err.to_string(), "AHCI not mapped");
}

#[test]
fn io_before_probe_has_no_disk() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::new(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    let mut buf = vec![0u8; SECTOR];
    assert_eq!(ahci.read(0, &mut buf, 1), Err(AhciError::NoDisk));
    assert_eq!(ahci.flush(), Err(AhciError::NoDisk));
}

#[test]
fn flush_has_no_data_phase() {
    let mut pages = pages();
    let sim = SimHba::new(0b1, &[0], SECTORS);
    let mut ahci = Ahci::init(sim, IdentityDma::MAPPED, &mut pages, PollBound::Unbounded).unwrap();
    ahci.flush().unwrap();
    let issued = ahci.hba().issued.borrow();
    let flush = issued.last().unwrap();
    assert_eq!(flush.command, ATA_CMD_FLUSH_CACHE);
    assert_eq!(flush.prdtl, 0);
    assert!(!flush.flags.write());
}
