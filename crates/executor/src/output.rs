//! This module contains the per-block [BlockOutput] accumulator.

use alloc::vec::Vec;
use alloy_primitives::Bytes;
use silex_mpt::Trie;
use silex_primitives::Log;

/// Everything one block's execution accumulates before the final root
/// comparison: the index tries, the log stream, the gas totals, and the
/// harvested requests.
#[derive(Debug, Clone, Default)]
pub struct BlockOutput {
    /// Gas consumed so far.
    pub block_gas_used: u64,
    /// Unsecured trie over the block's transactions, keyed by RLP index.
    pub transactions_trie: Trie<Bytes>,
    /// Unsecured trie over the block's receipts, keyed by RLP index.
    pub receipts_trie: Trie<Bytes>,
    /// The receipt trie keys, in transaction order.
    pub receipt_keys: Vec<Bytes>,
    /// Every log of the block, in emission order.
    pub block_logs: Vec<Log>,
    /// Unsecured trie over the block's withdrawals, keyed by RLP index.
    pub withdrawals_trie: Trie<Bytes>,
    /// Blob gas consumed so far.
    pub blob_gas_used: u64,
    /// Execution-layer requests (deposits, withdrawals, consolidations),
    /// each type-prefixed.
    pub requests: Vec<Bytes>,
}
