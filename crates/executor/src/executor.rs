//! The block body executor: system transactions, the per-transaction
//! driver, withdrawals, request harvesting, and pre-Paris rewards.

use crate::{
    constants::ETHER,
    errors::InvalidBlock,
    output::BlockOutput,
    preflight::check_transaction,
    requests::parse_deposit_requests,
    syscalls,
};
use alloc::vec::Vec;
use alloy_primitives::{Bytes, U256};
use alloy_rlp::Encodable;
use silex_evm::{gas, prepare_message, process_message_call, BlockEnv, TxEnv};
use silex_primitives::{
    Header, Receipt, ReceiptEnvelope, ReceiptOutcome, Transaction, Withdrawal,
};
use silex_state::State;
use tracing::{debug, info};

/// Executes a block body against the state, producing the accumulator
/// the driver compares against the header.
///
/// The caller has already validated the header and opened the
/// block-level checkpoint; everything here only needs transaction-level
/// atomicity.
pub fn apply_body(
    state: &mut State,
    block_env: &BlockEnv,
    transactions: &[Transaction],
    ommers: &[Header],
    withdrawals: Option<&[Withdrawal]>,
) -> Result<BlockOutput, InvalidBlock> {
    let fork = block_env.fork;
    let mut block_output = BlockOutput::default();

    info!(
        target: "executor",
        number = block_env.number,
        gas_limit = block_env.gas_limit,
        tx_count = transactions.len(),
        "executing block body"
    );

    syscalls::apply_beacon_roots_call(state, block_env);
    syscalls::apply_history_storage_call(state, block_env);

    for (index, tx) in transactions.iter().enumerate() {
        process_transaction(state, block_env, &mut block_output, tx, index as u64)?;
    }

    if let Some(withdrawals) = withdrawals {
        process_withdrawals(state, &mut block_output, withdrawals);
    }

    if fork.eip(6110) {
        if let Some(deposit_request) = parse_deposit_requests(&block_output.block_logs)? {
            block_output.requests.push(deposit_request);
        }
    }
    if fork.eip(7002) {
        if let Some(request) = syscalls::collect_withdrawal_requests(state, block_env)? {
            block_output.requests.push(request);
        }
    }
    if fork.eip(7251) {
        if let Some(request) = syscalls::collect_consolidation_requests(state, block_env)? {
            block_output.requests.push(request);
        }
    }

    if !fork.eip(3675) {
        pay_rewards(state, block_env, ommers);
    }

    Ok(block_output)
}

/// Runs one transaction: pre-flight, fee escrow, EVM execution, refund
/// and fee settlement, account sweeps, and receipt assembly.
pub fn process_transaction(
    state: &mut State,
    block_env: &BlockEnv,
    block_output: &mut BlockOutput,
    tx: &Transaction,
    index: u64,
) -> Result<(), InvalidBlock> {
    let fork = block_env.fork;
    let checked = check_transaction(state, block_env, block_output, tx)?;

    let mut index_key = Vec::new();
    index.encode(&mut index_key);
    let index_key = Bytes::from(index_key);
    block_output
        .transactions_trie
        .insert(index_key.clone(), tx.encoded_2718().into());

    debug!(
        target: "executor",
        tx_hash = %tx.hash(),
        sender = %checked.sender,
        gas_limit = tx.gas(),
        "executing transaction"
    );

    // Escrow the worst-case execution fee and the whole blob fee.
    let effective_gas_fee =
        U256::from(tx.gas()) * U256::from(checked.effective_gas_price);
    let blob_gas_fee = if fork.eip(4844) {
        gas::calculate_data_fee(fork, block_env.excess_blob_gas.unwrap_or_default(), tx)
    } else {
        U256::ZERO
    };
    state.sub_balance(checked.sender, effective_gas_fee + blob_gas_fee);
    state.increment_nonce(checked.sender);

    state.clear_transient_storage();
    state.clear_created_accounts();

    let mut accessed_addresses = alloc::collections::BTreeSet::new();
    let mut accessed_storage_keys = alloc::collections::BTreeSet::new();
    for entry in tx.access_list() {
        accessed_addresses.insert(entry.address);
        for key in &entry.storage_keys {
            accessed_storage_keys.insert((entry.address, *key));
        }
    }
    if fork.eip(3651) {
        accessed_addresses.insert(block_env.coinbase);
    }
    let tx_env = TxEnv {
        origin: checked.sender,
        gas_price: checked.effective_gas_price,
        gas: tx.gas() - checked.intrinsic.cost,
        blob_versioned_hashes: checked.blob_versioned_hashes.clone(),
        accessed_addresses,
        accessed_storage_keys,
        tx_hash: tx.hash(),
        index_in_block: index,
    };

    let message = prepare_message(block_env, &tx_env, state, tx);
    let tx_output = process_message_call(block_env, &tx_env, state, message);

    // Settle gas: refunds are capped at a fork-dependent fraction of
    // what execution consumed, and EIP-7623 floors the net usage.
    let gas_used_before_refund = tx.gas() - tx_output.gas_left;
    let refund_divisor = fork.eip_select(3529, 5, 2);
    let gas_refund =
        (gas_used_before_refund / refund_divisor).min(tx_output.refund_counter);
    let mut gas_used_after_refund = gas_used_before_refund - gas_refund;
    if fork.eip(7623) {
        gas_used_after_refund = gas_used_after_refund.max(checked.intrinsic.floor);
    }

    let gas_refund_amount = U256::from(tx.gas() - gas_used_after_refund)
        * U256::from(checked.effective_gas_price);
    state.add_balance(checked.sender, gas_refund_amount);

    let priority_fee_per_gas = checked.effective_gas_price
        - block_env.base_fee_per_gas.unwrap_or_default() as u128;
    let transaction_fee =
        U256::from(gas_used_after_refund) * U256::from(priority_fee_per_gas);
    // A zero fee must not materialize an empty coinbase account.
    let coinbase_balance_after =
        state.get_account(block_env.coinbase).balance + transaction_fee;
    if !coinbase_balance_after.is_zero() {
        state.set_balance(block_env.coinbase, coinbase_balance_after);
    } else if state.account_exists_and_is_empty(block_env.coinbase) {
        state.destroy_account(block_env.coinbase);
    }

    for address in &tx_output.accounts_to_delete {
        state.destroy_account(*address);
    }
    if fork.eip(161) {
        for address in &tx_output.touched_accounts {
            if state.account_exists_and_is_empty(*address) {
                state.destroy_account(*address);
            }
        }
    }

    state.clear_transient_storage();
    state.clear_created_accounts();

    block_output.block_gas_used += gas_used_after_refund;
    block_output.blob_gas_used += checked.blob_gas_used;

    let outcome = if fork.eip(658) {
        ReceiptOutcome::Status(tx_output.error.is_none())
    } else {
        ReceiptOutcome::PostState(state.state_root())
    };
    let receipt = ReceiptEnvelope {
        tx_type: tx.tx_type(),
        receipt: Receipt::new(outcome, block_output.block_gas_used, tx_output.logs.clone()),
    };
    block_output
        .receipts_trie
        .insert(index_key.clone(), receipt.encoded_2718().into());
    block_output.receipt_keys.push(index_key);
    block_output.block_logs.extend(tx_output.logs);

    debug!(
        target: "executor",
        tx_hash = %tx_env.tx_hash,
        gas_used = gas_used_after_refund,
        success = tx_output.error.is_none(),
        "transaction executed"
    );
    Ok(())
}

/// Credits consensus-layer withdrawals (amounts arrive in Gwei) and
/// indexes them into the withdrawals trie.
fn process_withdrawals(
    state: &mut State,
    block_output: &mut BlockOutput,
    withdrawals: &[Withdrawal],
) {
    for (index, withdrawal) in withdrawals.iter().enumerate() {
        let mut index_key = Vec::new();
        (index as u64).encode(&mut index_key);
        let mut encoded = Vec::new();
        withdrawal.encode(&mut encoded);
        block_output.withdrawals_trie.insert(index_key.into(), encoded.into());

        state.add_balance(withdrawal.address, withdrawal.amount_wei());
        if state.account_exists_and_is_empty(withdrawal.address) {
            state.destroy_account(withdrawal.address);
        }
    }
}

/// Pays the proof-of-work block and ommer rewards (5, 3, then 2 ether
/// across Frontier, Byzantium and Constantinople).
fn pay_rewards(state: &mut State, block_env: &BlockEnv, ommers: &[Header]) {
    let fork = block_env.fork;
    let block_reward = if fork.eip(1234) {
        U256::from(2) * ETHER
    } else if fork.eip(649) {
        U256::from(3) * ETHER
    } else {
        U256::from(5) * ETHER
    };

    let miner_reward =
        block_reward + U256::from(ommers.len() as u64) * (block_reward / U256::from(32));
    state.add_balance(block_env.coinbase, miner_reward);

    for ommer in ommers {
        // Ommers are at most six generations old; the reward scales
        // with the distance.
        let age = block_env.number - ommer.number;
        let ommer_reward = (U256::from(8 - age) * block_reward) / U256::from(8);
        state.add_balance(ommer.coinbase, ommer_reward);
    }
}
