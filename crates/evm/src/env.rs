//! Block- and transaction-scoped execution environments.

use alloc::{collections::BTreeSet, vec::Vec};
use alloy_primitives::{Address, B256, U256};
use silex_forks::Fork;

/// The immutable block-scoped inputs of every frame in a block.
#[derive(Debug, Clone)]
pub struct BlockEnv {
    /// The fork governing this block.
    pub fork: Fork,
    /// The chain id, supplied by the embedder.
    pub chain_id: u64,
    /// Block height.
    pub number: u64,
    /// Beneficiary of priority fees.
    pub coinbase: Address,
    /// Block timestamp.
    pub timestamp: u64,
    /// The RANDAO reveal (the difficulty mix hash, pre-Paris).
    pub prev_randao: B256,
    /// Proof-of-work difficulty; zero from Paris onward.
    pub difficulty: U256,
    /// Block gas ceiling.
    pub gas_limit: u64,
    /// EIP-1559 base fee, London onward.
    pub base_fee_per_gas: Option<u64>,
    /// Running blob gas excess, Cancun onward.
    pub excess_blob_gas: Option<u64>,
    /// Parent beacon block root, Cancun onward; consumed by the EIP-4788
    /// system transaction.
    pub parent_beacon_block_root: Option<B256>,
    /// Hashes of up to the 255 most recent ancestor blocks, oldest
    /// first, for BLOCKHASH.
    pub block_hashes: Vec<B256>,
}

/// The transaction-scoped inputs of every frame in one transaction.
#[derive(Debug, Clone, Default)]
pub struct TxEnv {
    /// The recovered sender.
    pub origin: Address,
    /// The effective gas price paid by the sender.
    pub gas_price: u128,
    /// Gas available to the transaction's outer frame, after the
    /// intrinsic charge.
    pub gas: u64,
    /// Blob versioned hashes, exposed through BLOBHASH.
    pub blob_versioned_hashes: Vec<B256>,
    /// Addresses pre-warmed by the transaction (access list, sender,
    /// target, precompiles, coinbase where EIP-3651 applies).
    pub accessed_addresses: BTreeSet<Address>,
    /// Storage keys pre-warmed by the transaction's access list.
    pub accessed_storage_keys: BTreeSet<(Address, B256)>,
    /// Hash of the transaction, for tracing.
    pub tx_hash: B256,
    /// Index of the transaction within its block.
    pub index_in_block: u64,
}
