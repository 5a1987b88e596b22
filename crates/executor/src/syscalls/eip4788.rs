//! Contains the logic for the pre-block EIP-4788 beacon-roots call.

use super::process_unchecked_system_transaction;
use crate::constants::BEACON_ROOTS_ADDRESS;
use alloy_primitives::Bytes;
use silex_evm::BlockEnv;
use silex_state::State;

/// Writes the parent beacon block root into the beacon-roots ring
/// buffer, via an unchecked system transaction.
pub(crate) fn apply_beacon_roots_call(state: &mut State, block_env: &BlockEnv) {
    if !block_env.fork.eip(4788) {
        return;
    }
    let root = block_env.parent_beacon_block_root.unwrap_or_default();
    process_unchecked_system_transaction(
        state,
        block_env,
        BEACON_ROOTS_ADDRESS,
        Bytes::copy_from_slice(root.as_slice()),
    );
}
