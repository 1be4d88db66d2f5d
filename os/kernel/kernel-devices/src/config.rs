//! Build-time defaults for the boot surface.

use core::ptr::NonNull;
use kernel_ahci::MmioHba;
use kernel_info::config::{DEFAULT_POLL_SPINS, DiscoveryConfig};
use kernel_info::poll::PollBound;

/// Poll bound used when the boot code does not choose one.
pub const DEFAULT_POLL: PollBound = if cfg!(feature = "bounded-poll") {
    PollBound::spins(DEFAULT_POLL_SPINS)
} else {
    PollBound::Unbounded
};

/// The configuration the kernel boots with unless told otherwise.
#[must_use]
pub const fn boot_config() -> DiscoveryConfig {
    DiscoveryConfig::new(kernel_info::platform::AHCI_WINDOW_BASE).with_poll(DEFAULT_POLL)
}

/// The controller window at `config.ahci_window`.
///
/// # Panics
/// `AHCI not mapped` if the configured address is null.
///
/// # Safety
/// A non-null window address must be mapped uncached over the controller's
/// registers for the rest of the kernel's life.
#[must_use]
pub unsafe fn hba_window(config: &DiscoveryConfig) -> MmioHba {
    let Some(base) = NonNull::new(config.ahci_window as *mut u8) else {
        panic!("AHCI not mapped");
    };
    // SAFETY: forwarded from the caller.
    unsafe { MmioHba::new(base) }
}
