//! The gas model: constants, fork-gated cost schedules, memory
//! expansion, the 63/64 call rule, intrinsic gas, and blob-gas pricing.

use crate::{VmError, VmResult};
use alloc::vec::Vec;
use alloy_primitives::U256;
use silex_forks::Fork;
use silex_primitives::Transaction;

/// Base cost charged to every transaction.
pub const TX_BASE_COST: u64 = 21_000;

/// Cost per zero byte of transaction data.
pub const TX_DATA_COST_PER_ZERO: u64 = 4;

/// Cost per access-list address (EIP-2930).
pub const TX_ACCESS_LIST_ADDRESS_COST: u64 = 2_400;

/// Cost per access-list storage key (EIP-2930).
pub const TX_ACCESS_LIST_STORAGE_KEY_COST: u64 = 1_900;

/// Cost per EIP-7702 authorization tuple.
pub const PER_EMPTY_ACCOUNT_COST: u64 = 25_000;

/// Base cost of processing an authorization whose authority already
/// exists; the difference to [PER_EMPTY_ACCOUNT_COST] is refunded.
pub const PER_AUTH_BASE_COST: u64 = 12_500;

/// The EIP-7825 transaction gas cap.
pub const TX_GAS_LIMIT_CAP: u64 = 16_777_216;

/// Deployed code size ceiling (EIP-170).
pub const MAX_CODE_SIZE: usize = 24_576;

/// Init code size ceiling (EIP-3860).
pub const MAX_INIT_CODE_SIZE: usize = 2 * MAX_CODE_SIZE;

pub const GAS_ZERO: u64 = 0;
pub const GAS_JUMPDEST: u64 = 1;
pub const GAS_BASE: u64 = 2;
pub const GAS_VERY_LOW: u64 = 3;
pub const GAS_LOW: u64 = 5;
pub const GAS_FAST_STEP: u64 = 5;
pub const GAS_MID: u64 = 8;
pub const GAS_HIGH: u64 = 10;
pub const GAS_EXPONENTIATION: u64 = 10;
pub const GAS_MEMORY: u64 = 3;
pub const GAS_KECCAK256: u64 = 30;
pub const GAS_KECCAK256_WORD: u64 = 6;
pub const GAS_COPY: u64 = 3;
pub const GAS_BLOCK_HASH: u64 = 20;
pub const GAS_LOG: u64 = 375;
pub const GAS_LOG_DATA: u64 = 8;
pub const GAS_LOG_TOPIC: u64 = 375;
pub const GAS_CREATE: u64 = 32_000;
pub const GAS_CODE_DEPOSIT: u64 = 200;
pub const GAS_NEW_ACCOUNT: u64 = 25_000;
pub const GAS_CALL_VALUE: u64 = 9_000;
pub const GAS_CALL_STIPEND: u64 = 2_300;
pub const GAS_SELF_DESTRUCT: u64 = 5_000;
pub const GAS_SELF_DESTRUCT_NEW_ACCOUNT: u64 = 25_000;
pub const GAS_STORAGE_SET: u64 = 20_000;
pub const GAS_STORAGE_UPDATE: u64 = 5_000;
pub const GAS_WARM_ACCESS: u64 = 100;
pub const GAS_COLD_SLOAD: u64 = 2_100;
pub const GAS_COLD_ACCOUNT_ACCESS: u64 = 2_600;
pub const GAS_INIT_CODE_WORD_COST: u64 = 2;
pub const GAS_BLOBHASH_OPCODE: u64 = 3;
pub const GAS_POINT_EVALUATION: u64 = 50_000;
pub const GAS_BLAKE2_PER_ROUND: u64 = 1;
pub const GAS_ECRECOVER: u64 = 3_000;
pub const GAS_SHA256: u64 = 60;
pub const GAS_SHA256_WORD: u64 = 12;
pub const GAS_RIPEMD160: u64 = 600;
pub const GAS_RIPEMD160_WORD: u64 = 120;
pub const GAS_IDENTITY: u64 = 15;
pub const GAS_IDENTITY_WORD: u64 = 3;
pub const GAS_BLS_G1_ADD: u64 = 375;
pub const GAS_BLS_G1_MUL: u64 = 12_000;
pub const GAS_BLS_G2_ADD: u64 = 600;
pub const GAS_BLS_G2_MUL: u64 = 22_500;
pub const GAS_BLS_PAIRING_BASE: u64 = 37_700;
pub const GAS_BLS_PAIRING_PER_PAIR: u64 = 32_600;
pub const GAS_BLS_MAP_FP_TO_G1: u64 = 5_500;
pub const GAS_BLS_MAP_FP2_TO_G2: u64 = 23_800;

/// Refund for clearing a storage slot, before EIP-3529 halved it.
pub const GAS_STORAGE_CLEAR_REFUND_PRE_LONDON: u64 = 15_000;

/// Refund for clearing a storage slot, from London onward.
pub const GAS_STORAGE_CLEAR_REFUND: u64 = 4_800;

/// Refund for SELFDESTRUCT, removed by EIP-3529.
pub const REFUND_SELF_DESTRUCT: u64 = 24_000;

/// Gas per data blob (EIP-4844).
pub const GAS_PER_BLOB: u64 = 1 << 17;

/// Floor of the blob gas price.
pub const MIN_BLOB_GASPRICE: u64 = 1;

/// Returns the cost of SLOAD before Berlin's warm/cold split.
pub fn sload_cost(fork: Fork) -> u64 {
    if fork.eip(1884) {
        800
    } else if fork.eip(150) {
        200
    } else {
        50
    }
}

/// Returns the flat component of the call-family cost before Berlin's
/// warm/cold split.
pub fn call_base_cost(fork: Fork) -> u64 {
    fork.eip_select(150, 700, 40)
}

/// Returns the cost of BALANCE before Berlin's warm/cold split.
pub fn balance_cost(fork: Fork) -> u64 {
    if fork.eip(1884) {
        700
    } else if fork.eip(150) {
        400
    } else {
        20
    }
}

/// Returns the base cost of EXTCODESIZE/EXTCODECOPY before Berlin's
/// warm/cold split.
pub fn extcode_base_cost(fork: Fork) -> u64 {
    fork.eip_select(150, 700, 20)
}

/// Returns the cost of EXTCODEHASH before Berlin's warm/cold split.
pub fn extcodehash_cost(fork: Fork) -> u64 {
    fork.eip_select(1884, 700, 400)
}

/// Returns the per-exponent-byte cost of EXP.
pub fn exp_byte_cost(fork: Fork) -> u64 {
    fork.eip_select(160, 50, 10)
}

/// Returns the flat cost of SELFDESTRUCT.
pub fn selfdestruct_cost(fork: Fork) -> u64 {
    fork.eip_select(150, GAS_SELF_DESTRUCT, 0)
}

/// Rounds up to the next multiple of 32.
pub const fn ceil32(value: u64) -> u64 {
    value.div_ceil(32) * 32
}

/// Computes the total cost of a memory footprint of `size_in_bytes`:
/// `3·words + words²/512`.
pub fn calculate_memory_gas_cost(size_in_bytes: u64) -> VmResult<u64> {
    let words = (size_in_bytes.div_ceil(32)) as u128;
    let total = words * GAS_MEMORY as u128 + words * words / 512;
    u64::try_from(total).map_err(|_| VmError::OutOfGas)
}

/// The outcome of a memory-extension calculation: the gas to charge and
/// the bytes to grow the frame's memory by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendMemory {
    /// The extension gas, `cost(after) − cost(before)`.
    pub cost: u64,
    /// The number of bytes to extend the memory by.
    pub expand_by: usize,
}

/// Computes the memory extension implied by a set of `(offset, size)`
/// extents. Zero-sized extents do not extend memory; offsets beyond the
/// addressable range surface as [VmError::OutOfGas] through the
/// quadratic cost.
pub fn calculate_gas_extend_memory(
    memory_len: usize,
    extensions: &[(U256, U256)],
) -> VmResult<ExtendMemory> {
    let mut size_to_extend = 0usize;
    let mut to_be_paid = 0u64;
    let mut current_size = memory_len as u64;

    for (offset, size) in extensions {
        if size.is_zero() {
            continue;
        }
        let offset = u64::try_from(*offset).map_err(|_| VmError::OutOfGas)?;
        let size = u64::try_from(*size).map_err(|_| VmError::OutOfGas)?;
        let after_size = ceil32(offset.checked_add(size).ok_or(VmError::OutOfGas)?);
        let before_size = ceil32(current_size);
        if after_size <= before_size {
            continue;
        }

        size_to_extend += (after_size - before_size) as usize;
        let already_paid = calculate_memory_gas_cost(before_size)?;
        let total_cost = calculate_memory_gas_cost(after_size)?;
        to_be_paid += total_cost - already_paid;
        current_size = after_size;
    }

    Ok(ExtendMemory { cost: to_be_paid, expand_by: size_to_extend })
}

/// The gas a child message call may receive under EIP-150: all but one
/// 64th of what remains.
pub const fn max_message_call_gas(gas: u64) -> u64 {
    gas - gas / 64
}

/// The two gas figures of a message call: what the caller is charged
/// and what the child frame receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCallGas {
    /// Charged to the calling frame (requested gas plus the access,
    /// transfer and new-account surcharges).
    pub cost: u64,
    /// Budget of the child frame (requested gas plus the value
    /// stipend, which the caller does not pay).
    pub sub_call: u64,
}

/// Computes the gas split of a call-family instruction.
///
/// From EIP-150 the requested gas is capped at 63/64 of what would
/// remain after the memory and surcharge costs; before it, the request
/// passes through verbatim (and an unaffordable request simply fails at
/// the charge).
pub fn calculate_message_call_gas(
    fork: Fork,
    value: U256,
    requested_gas: U256,
    gas_left: u64,
    memory_cost: u64,
    extra_gas: u64,
) -> MessageCallGas {
    let call_stipend = if value.is_zero() { 0 } else { GAS_CALL_STIPEND };
    let mut gas = u64::try_from(requested_gas).unwrap_or(u64::MAX);

    if fork.eip(150) && gas_left >= memory_cost.saturating_add(extra_gas) {
        gas = gas.min(max_message_call_gas(gas_left - memory_cost - extra_gas));
    }

    MessageCallGas {
        cost: gas.saturating_add(extra_gas),
        sub_call: gas.saturating_add(call_stipend),
    }
}

/// The EIP-3860 init-code charge: two gas per 32-byte word.
pub const fn init_code_cost(init_code_length: usize) -> u64 {
    GAS_INIT_CODE_WORD_COST * ceil32(init_code_length as u64) / 32
}

/// Intrinsic gas of a transaction, charged before any bytecode runs,
/// plus the EIP-7623 calldata floor enforced after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicGas {
    /// The up-front charge.
    pub cost: u64,
    /// The minimum total gas the transaction must end up consuming;
    /// zero before EIP-7623.
    pub floor: u64,
}

/// Computes the intrinsic cost of a transaction at the given fork.
pub fn intrinsic_gas(fork: Fork, tx: &Transaction) -> IntrinsicGas {
    let data = tx.data();
    let zero_bytes = data.iter().filter(|byte| **byte == 0).count() as u64;
    let nonzero_bytes = data.len() as u64 - zero_bytes;

    // EIP-7623 re-derives the same per-byte charges through its token
    // measure, so one formula covers both regimes.
    let nonzero_cost = fork.eip_select(2028, 16u64, 68u64);
    let data_cost = TX_DATA_COST_PER_ZERO * zero_bytes + nonzero_cost * nonzero_bytes;

    let mut create_cost = 0u64;
    if tx.is_create() {
        if fork.eip(2) {
            create_cost += GAS_CREATE;
        }
        if fork.eip(3860) {
            create_cost += init_code_cost(data.len());
        }
    }

    let mut access_list_cost = 0u64;
    for entry in tx.access_list() {
        access_list_cost += TX_ACCESS_LIST_ADDRESS_COST;
        access_list_cost +=
            TX_ACCESS_LIST_STORAGE_KEY_COST * entry.storage_keys.len() as u64;
    }

    let auth_cost = PER_EMPTY_ACCOUNT_COST * tx.authorizations().len() as u64;

    let cost = TX_BASE_COST + data_cost + create_cost + access_list_cost + auth_cost;
    let floor = if fork.eip(7623) {
        let tokens = zero_bytes + 4 * nonzero_bytes;
        TX_BASE_COST + 10 * tokens
    } else {
        0
    };
    IntrinsicGas { cost, floor }
}

/// The blob-price update fraction, raised with the EIP-7691 throughput
/// increase.
pub fn blob_base_fee_update_fraction(fork: Fork) -> u64 {
    fork.eip_select(7691, 5_007_716, 3_338_477)
}

/// The blob gas a block targets; excess above it raises the price.
pub fn target_blob_gas_per_block(fork: Fork) -> u64 {
    fork.eip_select(7691, 6 * GAS_PER_BLOB, 3 * GAS_PER_BLOB)
}

/// The blob gas ceiling of one block.
pub fn max_blob_gas_per_block(fork: Fork) -> u64 {
    fork.eip_select(7691, 9 * GAS_PER_BLOB, 6 * GAS_PER_BLOB)
}

/// The blob count ceiling of one transaction (equivalently, one block).
pub fn max_blobs_per_block(fork: Fork) -> usize {
    fork.eip_select(7691, 9, 6)
}

/// Total blob gas of a transaction: one [GAS_PER_BLOB] per carried blob.
pub fn calculate_total_blob_gas(tx: &Transaction) -> u64 {
    GAS_PER_BLOB * tx.blob_versioned_hashes().len() as u64
}

/// The blob gas price implied by the running excess.
pub fn calculate_blob_gas_price(fork: Fork, excess_blob_gas: u64) -> U256 {
    taylor_exponential(
        U256::from(MIN_BLOB_GASPRICE),
        U256::from(excess_blob_gas),
        U256::from(blob_base_fee_update_fraction(fork)),
    )
}

/// The total blob fee a transaction owes at the block's blob gas price.
pub fn calculate_data_fee(fork: Fork, excess_blob_gas: u64, tx: &Transaction) -> U256 {
    calculate_blob_gas_price(fork, excess_blob_gas)
        * U256::from(calculate_total_blob_gas(tx))
}

/// Approximates `factor · e^(numerator/denominator)` by summing the
/// Taylor series until a term underflows to zero, in integer arithmetic.
pub fn taylor_exponential(factor: U256, numerator: U256, denominator: U256) -> U256 {
    let mut i = U256::from(1);
    let mut output = U256::ZERO;
    let mut numerator_accumulated = factor * denominator;
    while !numerator_accumulated.is_zero() {
        output += numerator_accumulated;
        numerator_accumulated =
            (numerator_accumulated * numerator) / (denominator * i);
        i += U256::from(1);
    }
    output / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloy_primitives::{Address, Bytes, TxKind};
    use silex_primitives::{AccessListEntry, LegacyTx};

    #[test]
    fn test_memory_cost_is_quadratic() {
        assert_eq!(calculate_memory_gas_cost(0).unwrap(), 0);
        assert_eq!(calculate_memory_gas_cost(32).unwrap(), 3);
        assert_eq!(calculate_memory_gas_cost(1024).unwrap(), 32 * 3 + 2);
        // A footprint past 2^32 bytes costs more gas than any block has.
        assert!(calculate_memory_gas_cost(1 << 33).unwrap() > 30_000_000);
    }

    #[test]
    fn test_extend_memory_ignores_zero_extents() {
        let extended = calculate_gas_extend_memory(
            0,
            &[(U256::from(1u64 << 40), U256::ZERO)],
        )
        .unwrap();
        assert_eq!(extended, ExtendMemory { cost: 0, expand_by: 0 });
    }

    #[test]
    fn test_extend_memory_pays_the_difference() {
        let first = calculate_gas_extend_memory(0, &[(U256::ZERO, U256::from(64))]).unwrap();
        assert_eq!(first.cost, 6);
        assert_eq!(first.expand_by, 64);

        let second =
            calculate_gas_extend_memory(64, &[(U256::from(32), U256::from(64))]).unwrap();
        assert_eq!(second.cost, 3);
        assert_eq!(second.expand_by, 32);
    }

    #[test]
    fn test_extend_memory_huge_offset_is_out_of_gas() {
        assert_eq!(
            calculate_gas_extend_memory(0, &[(U256::MAX, U256::from(1))]),
            Err(VmError::OutOfGas),
        );
    }

    #[test]
    fn test_sixty_three_sixty_fourths() {
        assert_eq!(max_message_call_gas(6400), 6300);
        assert_eq!(max_message_call_gas(63), 63);
    }

    #[test]
    fn test_plain_transfer_intrinsic_gas() {
        let tx = Transaction::Legacy(LegacyTx {
            to: TxKind::Call(Address::with_last_byte(1)),
            ..Default::default()
        });
        assert_eq!(intrinsic_gas(Fork::London, &tx), IntrinsicGas { cost: 21_000, floor: 0 });
    }

    #[test]
    fn test_data_and_create_intrinsic_gas() {
        let tx = Transaction::Legacy(LegacyTx {
            to: TxKind::Create,
            data: Bytes::from_static(&[0x00, 0x01, 0x02]),
            ..Default::default()
        });
        // 21000 + 32000 (create) + 4 + 2*16 (data) + 2 (one init-code word).
        assert_eq!(intrinsic_gas(Fork::Shanghai, &tx).cost, 21_000 + 32_000 + 4 + 32 + 2);
        // Frontier charges 68 per non-zero byte and no create cost.
        assert_eq!(intrinsic_gas(Fork::Frontier, &tx).cost, 21_000 + 4 + 2 * 68);
    }

    #[test]
    fn test_access_list_intrinsic_gas() {
        let tx = Transaction::AccessList(silex_primitives::AccessListTx {
            to: TxKind::Call(Address::with_last_byte(1)),
            access_list: vec![AccessListEntry {
                address: Address::with_last_byte(2),
                storage_keys: vec![Default::default(), Default::default()],
            }],
            ..Default::default()
        });
        assert_eq!(
            intrinsic_gas(Fork::Berlin, &tx).cost,
            21_000 + 2_400 + 2 * 1_900,
        );
    }

    #[test]
    fn test_calldata_floor_from_prague() {
        let tx = Transaction::Legacy(LegacyTx {
            to: TxKind::Call(Address::with_last_byte(1)),
            data: Bytes::from_static(&[0x00, 0xff]),
            ..Default::default()
        });
        let gas = intrinsic_gas(Fork::Prague, &tx);
        assert_eq!(gas.cost, 21_000 + 4 + 16);
        assert_eq!(gas.floor, 21_000 + 10 * (1 + 4));
        assert_eq!(intrinsic_gas(Fork::Cancun, &tx).floor, 0);
    }

    #[test]
    fn test_blob_gas_price_at_zero_excess() {
        assert_eq!(calculate_blob_gas_price(Fork::Cancun, 0), U256::from(1));
    }

    #[test]
    fn test_blob_gas_price_is_monotonic() {
        let low = calculate_blob_gas_price(Fork::Cancun, 10_000_000);
        let high = calculate_blob_gas_price(Fork::Cancun, 40_000_000);
        assert!(high > low);
    }

    #[test]
    fn test_taylor_exponential_of_one() {
        // factor · e^1 with a large denominator: e ≈ 2.718 truncates to 2.
        let denominator = U256::from(1_000_000u64);
        assert_eq!(
            taylor_exponential(U256::from(1), denominator, denominator),
            U256::from(2),
        );
    }

    #[test]
    fn test_blob_schedule_bounds() {
        assert_eq!(max_blobs_per_block(Fork::Cancun), 6);
        assert_eq!(max_blobs_per_block(Fork::Prague), 9);
        assert_eq!(target_blob_gas_per_block(Fork::Cancun), 393_216);
        assert_eq!(max_blob_gas_per_block(Fork::Prague), 1_179_648);
    }
}
