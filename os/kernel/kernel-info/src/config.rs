//! # Discovery Configuration

use crate::platform::AHCI_WINDOW_BASE;
use crate::poll::PollBound;

/// Spin budget used when bounded polling is requested without an explicit count.
pub const DEFAULT_POLL_SPINS: u32 = 10_000_000;

/// Runtime knobs for the boot-time device layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DiscoveryConfig {
    /// Virtual address of the pre-mapped AHCI register window.
    pub ahci_window: usize,
    /// Bound applied to every hardware busy-wait.
    pub poll: PollBound,
}

impl DiscoveryConfig {
    #[must_use]
    pub const fn new(ahci_window: usize) -> Self {
        Self {
            ahci_window,
            poll: PollBound::Unbounded,
        }
    }

    /// Same configuration with a finite busy-wait budget.
    #[must_use]
    pub const fn with_poll(mut self, poll: PollBound) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new(AHCI_WINDOW_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polls_unbounded() {
        let cfg = DiscoveryConfig::default();
        assert_eq!(cfg.poll, PollBound::Unbounded);
        assert_eq!(cfg.ahci_window, AHCI_WINDOW_BASE);
    }

    #[test]
    fn bounded_override() {
        let cfg = DiscoveryConfig::default().with_poll(PollBound::spins(DEFAULT_POLL_SPINS));
        assert!(matches!(cfg.poll, PollBound::Spins(n) if n.get() == DEFAULT_POLL_SPINS));
    }
}
