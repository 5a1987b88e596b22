//! System transactions: protocol-initiated calls from the system
//! address that run outside the gas market.

use crate::{
    constants::{SYSTEM_ADDRESS, SYSTEM_TRANSACTION_GAS},
    errors::InvalidBlock,
};
use alloc::collections::BTreeSet;
use alloy_primitives::{Address, Bytes, TxKind, B256};
use silex_evm::{process_message_call, BlockEnv, Message, MessageCallOutput, TxEnv};
use silex_state::State;
use tracing::debug;

mod eip2935;
pub(crate) use eip2935::apply_history_storage_call;

mod eip4788;
pub(crate) use eip4788::apply_beacon_roots_call;

mod eip7002;
pub(crate) use eip7002::collect_withdrawal_requests;

mod eip7251;
pub(crate) use eip7251::collect_consolidation_requests;

/// Runs a system transaction: a message from [SYSTEM_ADDRESS] with a
/// fixed 30M gas budget, no intrinsic gas, no fee accounting, and no
/// EIP-161 sweep.
fn process_system_transaction(
    state: &mut State,
    block_env: &BlockEnv,
    target: Address,
    data: Bytes,
) -> MessageCallOutput {
    let code = state.get_code(target);
    let tx_env = TxEnv {
        origin: SYSTEM_ADDRESS,
        gas_price: 0,
        gas: SYSTEM_TRANSACTION_GAS,
        blob_versioned_hashes: alloc::vec::Vec::new(),
        accessed_addresses: BTreeSet::new(),
        accessed_storage_keys: BTreeSet::new(),
        tx_hash: B256::ZERO,
        index_in_block: 0,
    };
    let message = Message {
        caller: SYSTEM_ADDRESS,
        target: TxKind::Call(target),
        current_target: target,
        gas: SYSTEM_TRANSACTION_GAS,
        value: alloy_primitives::U256::ZERO,
        data,
        code,
        code_address: Some(target),
        depth: 0,
        should_transfer_value: false,
        is_static: false,
        accessed_addresses: BTreeSet::new(),
        accessed_storage_keys: BTreeSet::new(),
        disable_precompiles: false,
        accounts_to_delete: BTreeSet::new(),
        authorizations: alloc::vec::Vec::new(),
    };
    process_message_call(block_env, &tx_env, state, message)
}

/// An *unchecked* system transaction: failure is silently absorbed (the
/// frame's rollback already discarded any partial effect).
pub(crate) fn process_unchecked_system_transaction(
    state: &mut State,
    block_env: &BlockEnv,
    target: Address,
    data: Bytes,
) {
    let output = process_system_transaction(state, block_env, target, data);
    if let Some(error) = output.error {
        debug!(
            target: "executor",
            %target,
            %error,
            "unchecked system transaction failed"
        );
    }
}

/// A *checked* system transaction: the target must carry code and the
/// call must succeed, or the block is invalid. Returns the call's
/// output.
pub(crate) fn process_checked_system_transaction(
    state: &mut State,
    block_env: &BlockEnv,
    target: Address,
    data: Bytes,
) -> Result<Bytes, InvalidBlock> {
    if state.get_code(target).is_empty() {
        return Err(InvalidBlock::SystemContractEmpty(target));
    }
    let output = process_system_transaction(state, block_env, target, data);
    if output.error.is_some() {
        return Err(InvalidBlock::SystemContractCallFailed(target));
    }
    Ok(output.return_data)
}
