//! # Busy-Wait Polling
//!
//! Every hardware handshake in the discovery layer waits by spinning on a
//! condition. There are no interrupts and no timers this early in boot, so
//! a bound is expressed as a number of loop iterations.

use core::num::NonZeroU32;

/// How long [`spin_until`] may wait.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PollBound {
    /// Spin until the condition holds, however long that takes.
    #[default]
    Unbounded,
    /// Give up after this many unsuccessful evaluations.
    Spins(NonZeroU32),
}

impl PollBound {
    /// A bounded wait of `n` spins; `0` means unbounded.
    #[must_use]
    pub const fn spins(n: u32) -> Self {
        match NonZeroU32::new(n) {
            Some(n) => Self::Spins(n),
            None => Self::Unbounded,
        }
    }
}

/// A bounded wait ran out of spins before its condition held.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("condition not met after {spins} spins")]
pub struct PollTimeout {
    pub spins: u32,
}

/// Evaluate `cond` until it returns `true`.
///
/// With [`PollBound::Unbounded`] this only returns once the condition holds.
///
/// # Errors
/// [`PollTimeout`] if the bound is exhausted first.
pub fn spin_until(bound: PollBound, mut cond: impl FnMut() -> bool) -> Result<(), PollTimeout> {
    match bound {
        PollBound::Unbounded => {
            while !cond() {
                core::hint::spin_loop();
            }
            Ok(())
        }
        PollBound::Spins(limit) => {
            for _ in 0..limit.get() {
                if cond() {
                    return Ok(());
                }
                core::hint::spin_loop();
            }
            Err(PollTimeout { spins: limit.get() })
        }
    }
}
