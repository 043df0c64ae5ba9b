//! Initial strategy selection.

use super::Strategy;

/// The tiers a request can start on. Progressive analysis is absent: it is
/// only reached by escalation from [`InitialStrategy::ExtendedTimeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialStrategy {
    SinglePass,
    ExtendedTimeout,
}

impl From<InitialStrategy> for Strategy {
    fn from(initial: InitialStrategy) -> Self {
        match initial {
            InitialStrategy::SinglePass => Strategy::SinglePass,
            InitialStrategy::ExtendedTimeout => Strategy::ExtendedTimeout,
        }
    }
}

/// Choose the first tier for a document of `size_bytes`.
///
/// Documents up to and including `threshold_bytes` go single-pass; larger
/// ones start on the extended-timeout tier.
pub fn initial_strategy(size_bytes: u64, threshold_bytes: u64) -> InitialStrategy {
    if size_bytes > threshold_bytes {
        InitialStrategy::ExtendedTimeout
    } else {
        InitialStrategy::SinglePass
    }
}
