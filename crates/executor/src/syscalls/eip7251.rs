//! Contains the logic for dequeuing EIP-7251 consolidation requests.

use super::process_checked_system_transaction;
use crate::{constants::CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS, errors::InvalidBlock};
use alloc::vec::Vec;
use alloy_primitives::Bytes;
use silex_evm::BlockEnv;
use silex_state::State;

/// The request type tag of a consolidation request.
const CONSOLIDATION_REQUEST_TYPE: u8 = 0x02;

/// Dequeues the block's consolidation requests from the predeploy via a
/// checked system call, returning the type-prefixed request payload (or
/// `None` when the queue was empty).
pub(crate) fn collect_consolidation_requests(
    state: &mut State,
    block_env: &BlockEnv,
) -> Result<Option<Bytes>, InvalidBlock> {
    let return_data = process_checked_system_transaction(
        state,
        block_env,
        CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS,
        Bytes::new(),
    )?;
    if return_data.is_empty() {
        return Ok(None);
    }

    let mut request = Vec::with_capacity(1 + return_data.len());
    request.push(CONSOLIDATION_REQUEST_TYPE);
    request.extend_from_slice(&return_data);
    Ok(Some(request.into()))
}
