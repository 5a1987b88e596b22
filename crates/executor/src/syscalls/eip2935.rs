//! Contains the logic for the pre-block EIP-2935 history-storage call.

use super::process_unchecked_system_transaction;
use crate::constants::HISTORY_STORAGE_ADDRESS;
use alloy_primitives::Bytes;
use silex_evm::BlockEnv;
use silex_state::State;

/// Writes the parent block hash into the history-storage ring buffer,
/// via an unchecked system transaction.
pub(crate) fn apply_history_storage_call(state: &mut State, block_env: &BlockEnv) {
    if !block_env.fork.eip(2935) {
        return;
    }
    let Some(parent_hash) = block_env.block_hashes.last() else {
        return;
    };
    process_unchecked_system_transaction(
        state,
        block_env,
        HISTORY_STORAGE_ADDRESS,
        Bytes::copy_from_slice(parent_hash.as_slice()),
    );
}
