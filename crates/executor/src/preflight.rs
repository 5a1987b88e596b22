//! Transaction pre-flight: every check that must pass before a
//! transaction's bytecode is allowed to run.

use crate::{errors::InvalidTransaction, output::BlockOutput};
use alloc::vec::Vec;
use alloy_primitives::{Address, B256, U256};
use silex_evm::{gas, BlockEnv};
use silex_primitives::{
    is_delegation_designation, recover_sender, Transaction, TxType, VERSIONED_HASH_VERSION_KZG,
};
use silex_state::State;

/// The outputs of a successful pre-flight, consumed by the transaction
/// driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedTransaction {
    /// The recovered sender.
    pub sender: Address,
    /// The price actually paid per unit of gas.
    pub effective_gas_price: u128,
    /// Versioned hashes of the carried blobs.
    pub blob_versioned_hashes: Vec<B256>,
    /// Blob gas consumed by the transaction.
    pub blob_gas_used: u64,
    /// Intrinsic cost and EIP-7623 floor.
    pub intrinsic: gas::IntrinsicGas,
}

/// Validates a transaction against the block environment, the block's
/// running totals, and the sender's state (spec order: intrinsic
/// sanity, block capacity, signature, fee market, blob rules, fork
/// gating, sender state).
pub fn check_transaction(
    state: &State,
    block_env: &BlockEnv,
    block_output: &BlockOutput,
    tx: &Transaction,
) -> Result<CheckedTransaction, InvalidTransaction> {
    let fork = block_env.fork;

    // Fork gating of the transaction shape itself.
    let required_eip = match tx.tx_type() {
        TxType::Legacy => None,
        TxType::AccessList => Some(2930),
        TxType::FeeMarket => Some(1559),
        TxType::Blob => Some(4844),
        TxType::SetCode => Some(7702),
    };
    if let Some(eip) = required_eip {
        if !fork.eip(eip) {
            return Err(InvalidTransaction::TypeNotSupported(tx.tx_type().byte()));
        }
    }

    // Intrinsic sanity.
    let intrinsic = gas::intrinsic_gas(fork, tx);
    if intrinsic.cost.max(intrinsic.floor) > tx.gas() {
        return Err(InvalidTransaction::InsufficientIntrinsicGas);
    }
    if tx.nonce() == u64::MAX {
        return Err(InvalidTransaction::NonceOverflow);
    }
    if fork.eip(3860) && tx.is_create() && tx.data().len() > gas::MAX_INIT_CODE_SIZE {
        return Err(InvalidTransaction::InitCodeTooLarge);
    }
    if fork.eip(7825) && tx.gas() > gas::TX_GAS_LIMIT_CAP {
        return Err(InvalidTransaction::GasLimitCapExceeded);
    }

    // Block capacity.
    let gas_available = block_env.gas_limit - block_output.block_gas_used;
    if tx.gas() > gas_available {
        return Err(InvalidTransaction::GasAllowanceExceeded);
    }
    let blob_gas_used = gas::calculate_total_blob_gas(tx);
    if fork.eip(4844) {
        let blob_gas_available =
            gas::max_blob_gas_per_block(fork) - block_output.blob_gas_used;
        if blob_gas_used > blob_gas_available {
            return Err(InvalidTransaction::BlobGasAllowanceExceeded);
        }
    }

    // Signature recovery.
    let sender = recover_sender(fork, block_env.chain_id, tx)?;

    // Fee market.
    let base_fee = block_env.base_fee_per_gas;
    let (effective_gas_price, max_gas_fee) = match tx.max_fee_per_gas() {
        Some(max_fee_per_gas) => {
            let max_priority =
                tx.max_priority_fee_per_gas().expect("1559-style transactions carry both caps");
            let base_fee = base_fee.unwrap_or_default() as u128;
            if max_priority > max_fee_per_gas {
                return Err(InvalidTransaction::PriorityFeeGreaterThanMaxFee);
            }
            if max_fee_per_gas < base_fee {
                return Err(InvalidTransaction::MaxFeeBelowBaseFee);
            }
            let priority_fee_per_gas = max_priority.min(max_fee_per_gas - base_fee);
            (
                priority_fee_per_gas + base_fee,
                U256::from(tx.gas()) * U256::from(max_fee_per_gas),
            )
        }
        None => {
            let gas_price = tx.gas_price().expect("pre-1559 transactions carry a gas price");
            if let Some(base_fee) = base_fee {
                if gas_price < base_fee as u128 {
                    return Err(InvalidTransaction::GasPriceBelowBaseFee);
                }
            }
            (gas_price, U256::from(tx.gas()) * U256::from(gas_price))
        }
    };

    // Blob rules.
    let mut max_gas_fee = max_gas_fee;
    if let Transaction::Blob(blob_tx) = tx {
        if blob_tx.blob_versioned_hashes.is_empty() {
            return Err(InvalidTransaction::NoBlobData);
        }
        if blob_tx.blob_versioned_hashes.len() > gas::max_blobs_per_block(fork) {
            return Err(InvalidTransaction::TooManyBlobs);
        }
        if blob_tx
            .blob_versioned_hashes
            .iter()
            .any(|hash| hash[0] != VERSIONED_HASH_VERSION_KZG)
        {
            return Err(InvalidTransaction::InvalidVersionedHash);
        }

        let blob_gas_price = gas::calculate_blob_gas_price(
            fork,
            block_env.excess_blob_gas.unwrap_or_default(),
        );
        if U256::from(blob_tx.max_fee_per_blob_gas) < blob_gas_price {
            return Err(InvalidTransaction::InsufficientMaxFeePerBlobGas);
        }
        max_gas_fee += U256::from(blob_tx.max_fee_per_blob_gas) * U256::from(blob_gas_used);
    }
    if let Transaction::SetCode(set_code_tx) = tx {
        if set_code_tx.authorizations.is_empty() {
            return Err(InvalidTransaction::EmptyAuthorizationList);
        }
    }

    // Sender state.
    let sender_account = state.get_account(sender);
    if tx.nonce() < sender_account.nonce {
        return Err(InvalidTransaction::NonceTooLow);
    }
    if tx.nonce() > sender_account.nonce {
        return Err(InvalidTransaction::NonceTooHigh);
    }
    if sender_account.balance < max_gas_fee + tx.value() {
        return Err(InvalidTransaction::InsufficientBalance);
    }
    if !sender_account.code.is_empty() && !is_delegation_designation(&sender_account.code) {
        return Err(InvalidTransaction::SenderNotEoa);
    }

    Ok(CheckedTransaction {
        sender,
        effective_gas_price,
        blob_versioned_hashes: tx.blob_versioned_hashes().to_vec(),
        blob_gas_used,
        intrinsic,
    })
}
