//! This module contains the [Message] frame input and its construction
//! from a validated transaction.

use crate::{
    env::{BlockEnv, TxEnv},
    gas::{PER_AUTH_BASE_COST, PER_EMPTY_ACCOUNT_COST},
    precompiles,
};
use alloc::{collections::BTreeSet, vec::Vec};
use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy_rlp::Encodable;
use silex_primitives::{delegation_target, recover_authority, Authorization, Transaction};
use silex_state::State;
use tracing::trace;

/// The inputs of one message frame (a call or a create).
#[derive(Debug, Clone)]
pub struct Message {
    /// The account whose execution spawned this frame.
    pub caller: Address,
    /// Call target, or create.
    pub target: TxKind,
    /// The account whose context executes: the callee, or the address
    /// being created.
    pub current_target: Address,
    /// Gas available to this frame.
    pub gas: u64,
    /// Wei carried by the message.
    pub value: U256,
    /// Call data (empty for creates; the init code rides in `code`).
    pub data: Bytes,
    /// The executing bytecode.
    pub code: Bytes,
    /// The account the bytecode was loaded from, if any.
    pub code_address: Option<Address>,
    /// Frame depth; the transaction's outer frame is depth zero.
    pub depth: usize,
    /// Whether `value` actually moves (DELEGATECALL inherits value
    /// without transferring it).
    pub should_transfer_value: bool,
    /// Whether state mutation is forbidden (STATICCALL and below).
    pub is_static: bool,
    /// Warm addresses, cloned from the parent frame at entry.
    pub accessed_addresses: BTreeSet<Address>,
    /// Warm storage keys, cloned from the parent frame at entry.
    pub accessed_storage_keys: BTreeSet<(Address, B256)>,
    /// Skip precompile dispatch for this frame; set when the code was
    /// reached through an EIP-7702 delegation.
    pub disable_precompiles: bool,
    /// Deletion set inherited from the frame chain, so the SELFDESTRUCT
    /// refund can be issued at most once per originator.
    pub accounts_to_delete: BTreeSet<Address>,
    /// EIP-7702 authorizations to apply before the frame runs; only
    /// ever non-empty on a transaction's outer frame.
    pub authorizations: Vec<Authorization>,
}

/// Computes the address of a CREATE-deployed contract:
/// `last20(keccak(rlp([sender, nonce])))`.
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::new();
    sender.encode(&mut payload);
    nonce.encode(&mut payload);
    let mut preimage = Vec::with_capacity(payload.len() + 1);
    alloy_rlp::Header { list: true, payload_length: payload.len() }.encode(&mut preimage);
    preimage.extend_from_slice(&payload);
    Address::from_slice(&keccak256(preimage)[12..])
}

/// Computes the address of a CREATE2-deployed contract:
/// `last20(keccak(0xff ∥ sender ∥ salt ∥ keccak(init_code)))`.
pub fn compute_create2_contract_address(
    sender: Address,
    salt: B256,
    init_code: &[u8],
) -> Address {
    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_slice());
    preimage.extend_from_slice(salt.as_slice());
    preimage.extend_from_slice(keccak256(init_code).as_slice());
    Address::from_slice(&keccak256(preimage)[12..])
}

/// Builds the outer [Message] of one transaction's execution.
///
/// Resolves contract creation versus call, loads the target code
/// (following an EIP-7702 delegation designation if the target carries
/// one), and seeds the warm sets with the sender, the target, the
/// precompiles, and whatever the transaction environment pre-warmed.
///
/// The sender's nonce has already been incremented by the executor, so
/// a create derives its address from `nonce - 1`.
pub fn prepare_message(
    block_env: &BlockEnv,
    tx_env: &TxEnv,
    state: &State,
    tx: &Transaction,
) -> Message {
    let fork = block_env.fork;
    let mut accessed_addresses = tx_env.accessed_addresses.clone();
    accessed_addresses.insert(tx_env.origin);
    accessed_addresses.extend(precompiles::addresses(fork));

    let mut disable_precompiles = false;
    let (target, current_target, data, code, code_address) = match tx.to() {
        TxKind::Create => {
            let nonce = state.get_account(tx_env.origin).nonce - 1;
            let created = compute_contract_address(tx_env.origin, nonce);
            (TxKind::Create, created, Bytes::new(), tx.data().clone(), None)
        }
        TxKind::Call(address) => {
            let mut code_address = address;
            let mut code = state.get_code(address);
            if fork.eip(7702) {
                if let Some(delegate) = delegation_target(&code) {
                    disable_precompiles = true;
                    code_address = delegate;
                    accessed_addresses.insert(delegate);
                    code = state.get_code(delegate);
                }
            }
            (TxKind::Call(address), address, tx.data().clone(), code, Some(code_address))
        }
    };
    accessed_addresses.insert(current_target);

    Message {
        caller: tx_env.origin,
        target,
        current_target,
        gas: tx_env.gas,
        value: tx.value(),
        data,
        code,
        code_address,
        depth: 0,
        should_transfer_value: true,
        is_static: false,
        accessed_addresses,
        accessed_storage_keys: tx_env.accessed_storage_keys.clone(),
        disable_precompiles,
        accounts_to_delete: BTreeSet::new(),
        authorizations: tx.authorizations().to_vec(),
    }
}

/// Applies the message's EIP-7702 authorization list: installs (or
/// clears) delegation designations on every validly-authorizing EOA,
/// increments their nonces, and re-resolves the message's executing
/// code through any delegation now present on the target.
///
/// Returns the gas refunded for authorities that already existed.
pub fn set_delegation(state: &mut State, message: &mut Message, chain_id: u64) -> u64 {
    let mut refund = 0u64;

    for authorization in core::mem::take(&mut message.authorizations) {
        if !authorization.chain_id.is_zero()
            && authorization.chain_id != U256::from(chain_id)
        {
            continue;
        }
        if authorization.nonce == u64::MAX {
            continue;
        }
        let Ok(authority) = recover_authority(&authorization) else {
            continue;
        };
        message.accessed_addresses.insert(authority);

        let account = state.get_account(authority);
        if !account.code.is_empty() && delegation_target(&account.code).is_none() {
            continue;
        }
        if account.nonce != authorization.nonce {
            continue;
        }
        if state.account_exists(authority) {
            refund += PER_EMPTY_ACCOUNT_COST - PER_AUTH_BASE_COST;
        }

        let code = if authorization.address == Address::ZERO {
            Bytes::new()
        } else {
            let mut designation = silex_primitives::EOA_DELEGATION_PREFIX.to_vec();
            designation.extend_from_slice(authorization.address.as_slice());
            designation.into()
        };
        trace!(
            target: "evm",
            authority = %authority,
            delegate = %authorization.address,
            "applying code delegation"
        );
        state.set_code(authority, code);
        state.increment_nonce(authority);
    }

    // The target may have just received (or lost) a delegation; resolve
    // the executing code again.
    if let Some(code_address) = message.code_address {
        if let Some(delegate) = delegation_target(&state.get_code(code_address)) {
            message.disable_precompiles = true;
            message.code_address = Some(delegate);
            message.accessed_addresses.insert(delegate);
            message.code = state.get_code(delegate);
        }
    }

    refund
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_create_address_depends_on_nonce() {
        let sender = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        let a = compute_contract_address(sender, 0);
        let b = compute_contract_address(sender, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_create_address() {
        // The canonical vector: sender 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0
        // with nonce 0 deploys to 0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d.
        let sender = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            compute_contract_address(sender, 0),
            address!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"),
        );
    }

    #[test]
    fn test_create2_address_commits_to_init_code() {
        let sender = address!("00000000000000000000000000000000deadbeef");
        let salt = B256::ZERO;
        let a = compute_create2_contract_address(sender, salt, b"\x00");
        let b = compute_create2_contract_address(sender, salt, b"\x01");
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_create2_address() {
        // EIP-1014 example 1: deployer 0x0000...0000, salt 0, empty-ish
        // init code 0x00 deploys to 0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38.
        let sender = Address::ZERO;
        assert_eq!(
            compute_create2_contract_address(sender, B256::ZERO, b"\x00"),
            address!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"),
        );
    }
}
