//! Header validation: structural rules, the EIP-1559 base-fee schedule,
//! and the EIP-4844 excess-blob-gas recurrence.

use crate::{
    constants::{
        BASE_FEE_MAX_CHANGE_DENOMINATOR, ELASTICITY_MULTIPLIER, EMPTY_OMMER_HASH,
        GAS_LIMIT_ADJUSTMENT_FACTOR, GAS_LIMIT_MINIMUM,
    },
    errors::InvalidBlock,
};
use alloy_primitives::B64;
use silex_evm::gas::target_blob_gas_per_block;
use silex_forks::Fork;
use silex_primitives::Header;

/// The base fee of the first EIP-1559 block.
pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Returns `true` if a block gas limit is within the adjustment band of
/// its parent's and above the floor.
fn check_gas_limit(gas_limit: u64, parent_gas_limit: u64) -> bool {
    let max_adjustment_delta = parent_gas_limit / GAS_LIMIT_ADJUSTMENT_FACTOR;
    gas_limit < parent_gas_limit + max_adjustment_delta
        && gas_limit > parent_gas_limit - max_adjustment_delta
        && gas_limit >= GAS_LIMIT_MINIMUM
}

/// Computes the base fee a block must carry, given its parent's fee and
/// fullness (EIP-1559: the fee drifts toward the half-full target by at
/// most 1/8 per block, with a minimum upward step of one).
pub fn calculate_base_fee_per_gas(
    gas_limit: u64,
    parent_gas_limit: u64,
    parent_gas_used: u64,
    parent_base_fee_per_gas: u64,
) -> Result<u64, InvalidBlock> {
    let parent_gas_target = parent_gas_limit / ELASTICITY_MULTIPLIER;
    if !check_gas_limit(gas_limit, parent_gas_limit) {
        return Err(InvalidBlock::InvalidGasLimit);
    }

    let expected = if parent_gas_used == parent_gas_target {
        parent_base_fee_per_gas
    } else if parent_gas_used > parent_gas_target {
        let gas_used_delta = (parent_gas_used - parent_gas_target) as u128;
        let fee_delta = (parent_base_fee_per_gas as u128 * gas_used_delta
            / parent_gas_target as u128
            / BASE_FEE_MAX_CHANGE_DENOMINATOR as u128)
            .max(1);
        parent_base_fee_per_gas + fee_delta as u64
    } else {
        let gas_used_delta = (parent_gas_target - parent_gas_used) as u128;
        let fee_delta = parent_base_fee_per_gas as u128 * gas_used_delta
            / parent_gas_target as u128
            / BASE_FEE_MAX_CHANGE_DENOMINATOR as u128;
        parent_base_fee_per_gas - fee_delta as u64
    };
    Ok(expected)
}

/// The excess-blob-gas recurrence: the running excess grows by whatever
/// the parent consumed above the target and never goes negative.
pub fn calculate_excess_blob_gas(fork: Fork, parent: &Header) -> u64 {
    let parent_excess = parent.excess_blob_gas.unwrap_or_default();
    let parent_used = parent.blob_gas_used.unwrap_or_default();
    (parent_excess + parent_used).saturating_sub(target_blob_gas_per_block(fork))
}

/// One required-or-forbidden presence check for a fork-gated header
/// field.
fn check_presence<T>(
    fork: Fork,
    eip: u64,
    field: &Option<T>,
    name: &'static str,
) -> Result<(), InvalidBlock> {
    if fork.eip(eip) == field.is_some() {
        Ok(())
    } else {
        Err(InvalidBlock::InvalidHeaderField(name))
    }
}

/// Validates a header against its parent under the block's fork.
pub fn validate_header(fork: Fork, parent: &Header, header: &Header) -> Result<(), InvalidBlock> {
    check_presence(fork, 1559, &header.base_fee_per_gas, "base_fee_per_gas")?;
    check_presence(fork, 4895, &header.withdrawals_root, "withdrawals_root")?;
    check_presence(fork, 4844, &header.blob_gas_used, "blob_gas_used")?;
    check_presence(fork, 4844, &header.excess_blob_gas, "excess_blob_gas")?;
    check_presence(fork, 4788, &header.parent_beacon_block_root, "parent_beacon_block_root")?;
    check_presence(fork, 7685, &header.requests_hash, "requests_hash")?;

    if header.number < 1 || header.number != parent.number + 1 {
        return Err(InvalidBlock::InvalidNumber);
    }
    if header.timestamp <= parent.timestamp {
        return Err(InvalidBlock::InvalidTimestamp);
    }
    if header.gas_used > header.gas_limit {
        return Err(InvalidBlock::InvalidGasUsed);
    }

    if let Some(base_fee_per_gas) = header.base_fee_per_gas {
        let expected = match parent.base_fee_per_gas {
            Some(parent_base_fee) => calculate_base_fee_per_gas(
                header.gas_limit,
                parent.gas_limit,
                parent.gas_used,
                parent_base_fee,
            )?,
            // The fork block itself starts from the initial fee.
            None => INITIAL_BASE_FEE,
        };
        if base_fee_per_gas != expected {
            return Err(InvalidBlock::InvalidBaseFee);
        }
    } else if !check_gas_limit(header.gas_limit, parent.gas_limit) {
        return Err(InvalidBlock::InvalidGasLimit);
    }

    if fork.eip(4844) {
        let expected = calculate_excess_blob_gas(fork, parent);
        if header.excess_blob_gas != Some(expected) {
            return Err(InvalidBlock::InvalidExcessBlobGas);
        }
    }

    if fork.eip(3675) {
        if !header.difficulty.is_zero() || header.nonce != B64::ZERO {
            return Err(InvalidBlock::InvalidPowFields);
        }
        if header.ommers_hash != EMPTY_OMMER_HASH {
            return Err(InvalidBlock::InvalidOmmers);
        }
    }

    if header.extra_data.len() > 32 {
        return Err(InvalidBlock::ExtraDataTooLong);
    }
    if header.parent_hash != parent.hash() {
        return Err(InvalidBlock::InvalidParentHash);
    }
    Ok(())
}
