//! End-to-end interpreter scenarios: running real bytecode through the
//! message-call machinery against a live state.

use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use silex_evm::{
    compute_contract_address, process_message_call, BlockEnv, Message, TxEnv, VmError,
};
use silex_forks::Fork;
use silex_state::{Account, State};
use std::collections::BTreeSet;

fn block_env(fork: Fork) -> BlockEnv {
    BlockEnv {
        fork,
        chain_id: 1,
        number: 10,
        coinbase: Address::with_last_byte(0xcb),
        timestamp: 1_000,
        prev_randao: B256::ZERO,
        difficulty: U256::ZERO,
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(7),
        excess_blob_gas: Some(0),
        parent_beacon_block_root: None,
        block_hashes: vec![],
    }
}

fn call_message(caller: Address, target: Address, code: Bytes, gas: u64) -> Message {
    Message {
        caller,
        target: TxKind::Call(target),
        current_target: target,
        gas,
        value: U256::ZERO,
        data: Bytes::new(),
        code,
        code_address: Some(target),
        depth: 0,
        should_transfer_value: true,
        is_static: false,
        accessed_addresses: BTreeSet::from([caller, target]),
        accessed_storage_keys: BTreeSet::new(),
        disable_precompiles: false,
        accounts_to_delete: BTreeSet::new(),
        authorizations: vec![],
    }
}

#[test]
fn test_add_and_return() {
    // PUSH1 2, PUSH1 3, ADD, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = Bytes::from_static(&[
        0x60, 0x02, 0x60, 0x03, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3,
    ]);
    let contract = Address::with_last_byte(0xc0);
    let mut state = State::new();
    state.set_account(contract, Some(Account { code: code.clone(), ..Default::default() }));

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let output = process_message_call(
        &env,
        &tx_env,
        &mut state,
        call_message(Address::with_last_byte(0xaa), contract, code, 100_000),
    );

    assert!(output.error.is_none());
    assert_eq!(
        U256::from_be_slice(&output.return_data),
        U256::from(5),
    );
}

#[test]
fn test_revert_preserves_output_and_gas() {
    // PUSH1 0xaa, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, REVERT
    let code =
        Bytes::from_static(&[0x60, 0xaa, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xfd]);
    let contract = Address::with_last_byte(0xc1);
    let mut state = State::new();
    state.set_account(contract, Some(Account { code: code.clone(), ..Default::default() }));
    state.set_storage(contract, B256::ZERO, U256::from(1));
    let pre_root = state.state_root();

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let output = process_message_call(
        &env,
        &tx_env,
        &mut state,
        call_message(Address::with_last_byte(0xaa), contract, code, 100_000),
    );

    assert_eq!(output.error, Some(VmError::Revert));
    assert_eq!(output.return_data, Bytes::from_static(&[0xaa]));
    assert!(output.gas_left > 0);
    assert!(output.logs.is_empty());
    assert_eq!(state.state_root(), pre_root);
}

#[test]
fn test_invalid_opcode_consumes_all_gas() {
    let code = Bytes::from_static(&[0xfe]);
    let contract = Address::with_last_byte(0xc2);
    let mut state = State::new();
    state.set_account(contract, Some(Account { code: code.clone(), ..Default::default() }));

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let output = process_message_call(
        &env,
        &tx_env,
        &mut state,
        call_message(Address::with_last_byte(0xaa), contract, code, 100_000),
    );

    assert_eq!(output.error, Some(VmError::InvalidOpcode(0xfe)));
    assert_eq!(output.gas_left, 0);
    assert!(output.return_data.is_empty());
}

#[test]
fn test_create_collision_burns_nonce_only() {
    let factory = Address::with_last_byte(0xfa);
    // The factory's next CREATE lands here.
    let destination = compute_contract_address(factory, 0);

    // PUSH1 0 (size), PUSH1 0 (offset), PUSH1 5 (value), CREATE, STOP
    let code = Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0x60, 0x05, 0xf0, 0x00]);
    let mut state = State::new();
    state.set_account(
        factory,
        Some(Account { balance: U256::from(10), code: code.clone(), ..Default::default() }),
    );
    // The destination already has storage: a collision.
    state.set_account(destination, Some(Account::default()));
    state.set_storage(destination, B256::with_last_byte(1), U256::from(1));

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let output = process_message_call(
        &env,
        &tx_env,
        &mut state,
        call_message(Address::with_last_byte(0xaa), factory, code, 200_000),
    );

    assert!(output.error.is_none());
    // The nonce burns, the endowment does not move, the storage stays.
    assert_eq!(state.get_account(factory).nonce, 1);
    assert_eq!(state.get_account(factory).balance, U256::from(10));
    assert_eq!(
        state.get_storage(destination, B256::with_last_byte(1)),
        U256::from(1),
    );
    assert!(state.get_account(destination).code.is_empty());
}

fn selfdestruct_code(beneficiary: Address) -> Bytes {
    // PUSH20 <beneficiary>, SELFDESTRUCT
    let mut code = vec![0x73];
    code.extend_from_slice(beneficiary.as_slice());
    code.push(0xff);
    code.into()
}

#[test]
fn test_selfdestruct_of_old_contract_survives_cancun() {
    let beneficiary = Address::with_last_byte(0xbe);
    let contract = Address::with_last_byte(0xc4);
    let code = selfdestruct_code(beneficiary);

    let mut state = State::new();
    state.set_account(
        contract,
        Some(Account { balance: U256::from(5), code: code.clone(), nonce: 1 }),
    );

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let output = process_message_call(
        &env,
        &tx_env,
        &mut state,
        call_message(Address::with_last_byte(0xaa), contract, code, 200_000),
    );

    assert!(output.error.is_none());
    // EIP-6780: the ether moves but the pre-existing account is not
    // queued for deletion, and no refund is issued.
    assert!(output.accounts_to_delete.is_empty());
    assert_eq!(output.refund_counter, 0);
    assert_eq!(state.get_account(beneficiary).balance, U256::from(5));
    assert_eq!(state.get_account(contract).balance, U256::ZERO);
}

#[test]
fn test_selfdestruct_in_creating_transaction_deletes() {
    let beneficiary = Address::with_last_byte(0xbe);
    let creator = Address::with_last_byte(0xaa);
    let created = compute_contract_address(creator, 0);

    let mut state = State::new();
    state.set_account(creator, Some(Account { balance: U256::from(9), ..Default::default() }));
    state.increment_nonce(creator);

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let message = Message {
        caller: creator,
        target: TxKind::Create,
        current_target: created,
        gas: 200_000,
        value: U256::from(9),
        data: Bytes::new(),
        code: selfdestruct_code(beneficiary),
        code_address: None,
        depth: 0,
        should_transfer_value: true,
        is_static: false,
        accessed_addresses: BTreeSet::from([creator, created]),
        accessed_storage_keys: BTreeSet::new(),
        disable_precompiles: false,
        accounts_to_delete: BTreeSet::new(),
        authorizations: vec![],
    };
    let output = process_message_call(&env, &tx_env, &mut state, message);

    assert!(output.error.is_none());
    // Created in this very transaction, so EIP-6780 still deletes it.
    assert!(output.accounts_to_delete.contains(&created));
    assert_eq!(state.get_account(beneficiary).balance, U256::from(9));
}

#[test]
fn test_static_call_rejects_storage_writes() {
    let target = Address::with_last_byte(0xc5);
    // PUSH1 1, PUSH1 0, SSTORE
    let inner_code = Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55]);
    let mut state = State::new();
    state.set_account(target, Some(Account { code: inner_code.clone(), ..Default::default() }));

    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();
    let mut message = call_message(Address::with_last_byte(0xaa), target, inner_code, 100_000);
    message.is_static = true;
    let output = process_message_call(&env, &tx_env, &mut state, message);

    assert_eq!(output.error, Some(VmError::WriteInStaticContext));
    assert_eq!(state.get_storage(target, B256::ZERO), U256::ZERO);
}

#[test]
fn test_identity_precompile_via_dispatch() {
    let mut state = State::new();
    let env = block_env(Fork::Cancun);
    let tx_env = TxEnv::default();

    let identity = Address::with_last_byte(0x04);
    let mut message =
        call_message(Address::with_last_byte(0xaa), identity, Bytes::new(), 100_000);
    message.data = Bytes::from_static(b"echo");
    let output = process_message_call(&env, &tx_env, &mut state, message);

    assert!(output.error.is_none());
    assert_eq!(output.return_data, Bytes::from_static(b"echo"));
    // 15 base + 3 per word.
    assert_eq!(output.gas_left, 100_000 - 18);
}
