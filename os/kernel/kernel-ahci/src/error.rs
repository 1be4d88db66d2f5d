use crate::port::PortState;
use kernel_info::addr::PhysicalAddress;

/// Failures of the AHCI driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AhciError {
    /// The controller's register window is not mapped.
    #[error("AHCI not mapped")]
    NotMapped { base: usize },

    /// No implemented port has a working device behind it.
    #[error("Disk not found!")]
    NoDisk,

    #[error("port {port} does not exist")]
    NoSuchPort { port: u8 },

    /// A DMA structure or buffer has no bus address.
    #[error("port {port}: {va:#x} is not reachable by DMA")]
    NotDmaReachable { port: u8, va: usize },

    /// The port's engines are not in a state to accept a command.
    #[error("port {port} is {state:?}")]
    NotRunning { port: u8, state: PortState },

    /// The device reported ERR or DF in the task-file status.
    #[error("port {port}: device error (status {status:#04x}, error {error:#04x})")]
    TaskFile { port: u8, status: u8, error: u8 },

    /// A bounded busy-wait gave up.
    #[error("port {port}: no response after {spins} spins")]
    Timeout { port: u8, spins: u32 },

    #[error("{len}-byte buffer cannot hold {sectors} sectors")]
    BufferTooSmall { len: usize, sectors: u16 },

    /// The transfer does not fit on the disk or in a 48-bit LBA.
    #[error("sectors {sector}+{count} lie beyond the last of {limit}")]
    OutOfRange { sector: u64, count: u16, limit: u64 },

    /// PRD data must start on a word boundary and span whole words.
    #[error("port {port}: {len}-byte buffer at {pa} is not word aligned")]
    Misaligned {
        port: u8,
        pa: PhysicalAddress,
        len: usize,
    },
}
