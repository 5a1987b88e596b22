//! This module contains the [ForkSchedule] and [ChainSpec] types, which
//! resolve the fork governing a block from the chain's activation history.

use crate::Fork;
use alloc::vec::Vec;

/// The condition under which a scheduled fork becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkActivation {
    /// Active from the given block number onward.
    Block(u64),
    /// Active from the given block timestamp onward. All post-Paris forks
    /// activate by timestamp.
    Timestamp(u64),
}

impl ForkActivation {
    /// Returns `true` if a block with the given number and timestamp is at
    /// or past this activation point.
    pub const fn is_active(self, number: u64, timestamp: u64) -> bool {
        match self {
            Self::Block(block) => number >= block,
            Self::Timestamp(time) => timestamp >= time,
        }
    }
}

/// An ordered list of fork activations for a chain.
///
/// Entries must be given in activation order. The schedule also doubles as
/// the spec's "transition fork" notion: a two-entry schedule with a
/// timestamp boundary switches rule sets mid-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkSchedule {
    entries: Vec<(ForkActivation, Fork)>,
}

impl ForkSchedule {
    /// Creates a schedule from `(activation, fork)` pairs in activation
    /// order.
    pub const fn new(entries: Vec<(ForkActivation, Fork)>) -> Self {
        Self { entries }
    }

    /// Creates a schedule with a single fork active from genesis.
    pub fn single(fork: Fork) -> Self {
        Self { entries: alloc::vec![(ForkActivation::Block(0), fork)] }
    }

    /// Resolves the fork governing a block with the given number and
    /// timestamp. Blocks before the first scheduled activation fall back to
    /// [Fork::Frontier].
    pub fn fork_at(&self, number: u64, timestamp: u64) -> Fork {
        self.entries
            .iter()
            .rev()
            .find(|(activation, _)| activation.is_active(number, timestamp))
            .map_or(Fork::Frontier, |(_, fork)| *fork)
    }

    /// The Ethereum mainnet activation history.
    pub fn mainnet() -> Self {
        Self::new(alloc::vec![
            (ForkActivation::Block(0), Fork::Frontier),
            (ForkActivation::Block(1_150_000), Fork::Homestead),
            (ForkActivation::Block(2_463_000), Fork::Tangerine),
            (ForkActivation::Block(2_675_000), Fork::SpuriousDragon),
            (ForkActivation::Block(4_370_000), Fork::Byzantium),
            (ForkActivation::Block(7_280_000), Fork::Constantinople),
            (ForkActivation::Block(9_069_000), Fork::Istanbul),
            (ForkActivation::Block(12_244_000), Fork::Berlin),
            (ForkActivation::Block(12_965_000), Fork::London),
            (ForkActivation::Block(15_537_394), Fork::Paris),
            (ForkActivation::Timestamp(1_681_338_455), Fork::Shanghai),
            (ForkActivation::Timestamp(1_710_338_135), Fork::Cancun),
            (ForkActivation::Timestamp(1_746_612_311), Fork::Prague),
        ])
    }
}

/// Chain-level configuration: the chain id and the fork schedule.
///
/// The chain id is supplied by the embedder and never mutated by the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    /// The EIP-155 chain id.
    pub chain_id: u64,
    /// The fork activation schedule.
    pub schedule: ForkSchedule,
}

impl ChainSpec {
    /// Creates a new chain spec.
    pub const fn new(chain_id: u64, schedule: ForkSchedule) -> Self {
        Self { chain_id, schedule }
    }

    /// Creates a chain spec with a single fork active from genesis.
    pub fn single(chain_id: u64, fork: Fork) -> Self {
        Self::new(chain_id, ForkSchedule::single(fork))
    }

    /// The Ethereum mainnet chain spec.
    pub fn mainnet() -> Self {
        Self::new(1, ForkSchedule::mainnet())
    }

    /// Resolves the fork governing a block with the given number and
    /// timestamp.
    pub fn fork_at(&self, number: u64, timestamp: u64) -> Fork {
        self.schedule.fork_at(number, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_boundaries() {
        let spec = ChainSpec::mainnet();
        assert_eq!(spec.fork_at(0, 0), Fork::Frontier);
        assert_eq!(spec.fork_at(12_964_999, 0), Fork::Berlin);
        assert_eq!(spec.fork_at(12_965_000, 0), Fork::London);
        assert_eq!(spec.fork_at(20_000_000, 1_681_338_454), Fork::Paris);
        assert_eq!(spec.fork_at(20_000_000, 1_710_338_135), Fork::Cancun);
    }

    #[test]
    fn test_timestamp_transition() {
        // The two-fork schedule the spec calls "ShanghaiToCancunAtTime15k".
        let schedule = ForkSchedule::new(alloc::vec![
            (ForkActivation::Block(0), Fork::Shanghai),
            (ForkActivation::Timestamp(15_000), Fork::Cancun),
        ]);
        assert_eq!(schedule.fork_at(10, 14_999), Fork::Shanghai);
        assert_eq!(schedule.fork_at(10, 15_000), Fork::Cancun);
    }

    #[test]
    fn test_single_fork_schedule() {
        let spec = ChainSpec::single(1, Fork::Cancun);
        assert_eq!(spec.fork_at(0, 0), Fork::Cancun);
        assert_eq!(spec.fork_at(u64::MAX, u64::MAX), Fork::Cancun);
    }
}
