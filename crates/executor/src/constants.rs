//! Protocol constants for the executor.

use alloy_primitives::{address, b256, Address, B256, U256};

/// The pseudo-sender of system transactions.
pub const SYSTEM_ADDRESS: Address = address!("fffffffffffffffffffffffffffffffffffffffe");

/// The EIP-4788 beacon-roots predeploy.
pub const BEACON_ROOTS_ADDRESS: Address = address!("000F3df6D732807Ef1319fB7B8bB8522d0Beac02");

/// The EIP-2935 block-hash-history predeploy.
pub const HISTORY_STORAGE_ADDRESS: Address =
    address!("0000F90827F1C53a10cb7A02335B175320002935");

/// The EIP-7002 withdrawal-request predeploy.
pub const WITHDRAWAL_REQUEST_PREDEPLOY_ADDRESS: Address =
    address!("00000961Ef480Eb55e80D19ad83579A64c007002");

/// The EIP-7251 consolidation-request predeploy.
pub const CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS: Address =
    address!("0000BBdDc7CE488642fb579F8B00f3a590007251");

/// The mainnet beacon-chain deposit contract (EIP-6110).
pub const DEPOSIT_CONTRACT_ADDRESS: Address =
    address!("00000000219ab540356cBB839Cbe05303d7705Fa");

/// Gas budget of a system transaction.
pub(crate) const SYSTEM_TRANSACTION_GAS: u64 = 30_000_000;

/// The EIP-7934 block size cap: 10 MiB less a safety margin.
pub const MAX_RLP_BLOCK_SIZE: usize = 10_485_760 - 2_097_152;

/// Gas-limit adjustment bound denominator.
pub(crate) const GAS_LIMIT_ADJUSTMENT_FACTOR: u64 = 1024;

/// Minimum block gas limit.
pub(crate) const GAS_LIMIT_MINIMUM: u64 = 5_000;

/// The EIP-1559 elasticity multiplier.
pub(crate) const ELASTICITY_MULTIPLIER: u64 = 2;

/// The EIP-1559 base-fee change bound denominator.
pub(crate) const BASE_FEE_MAX_CHANGE_DENOMINATOR: u64 = 8;

/// `keccak(rlp([]))`, the ommers hash of an ommerless block.
pub(crate) const EMPTY_OMMER_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// One ether, in Wei.
pub(crate) const ETHER: U256 = U256::from_limbs([0x0de0_b6b3_a764_0000, 0, 0, 0]);
