//! Block-level scenarios: sealing candidate blocks against a live chain
//! and driving them through the state-transition function.

use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use k256::ecdsa::{RecoveryId, SigningKey};
use rstest::rstest;
use silex_evm::{gas, BlockEnv};
use silex_executor::{
    apply_body, check_transaction, compute_requests_hash, BlockChain, BlockOutput,
    InvalidBlock, InvalidTransaction,
};
use silex_forks::{ChainSpec, Fork};
use silex_primitives::{
    logs_bloom, signing_hash, Block, BlobTx, Header, LegacyTx, Transaction, Withdrawal,
};
use silex_state::{Account, State};

const GWEI: u128 = 1_000_000_000;
const ETHER: u64 = 1_000_000_000_000_000_000;

fn test_key() -> SigningKey {
    SigningKey::from_slice(&[0x01; 32]).unwrap()
}

fn key_address(key: &SigningKey) -> Address {
    let uncompressed = key.verifying_key().to_encoded_point(false);
    Address::from_slice(&keccak256(&uncompressed.as_bytes()[1..])[12..])
}

fn sign_prehash(key: &SigningKey, hash: B256) -> (U256, U256, u8) {
    let (mut signature, mut recovery_id) =
        key.sign_prehash_recoverable(hash.as_slice()).unwrap();
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::from_byte(recovery_id.to_byte() ^ 1).unwrap();
    }
    (
        U256::from_be_slice(&signature.r().to_bytes()),
        U256::from_be_slice(&signature.s().to_bytes()),
        recovery_id.to_byte(),
    )
}

/// Signs a legacy transaction with the pre-155 scheme.
fn sign_legacy(mut tx: LegacyTx, key: &SigningKey) -> Transaction {
    let hash = signing_hash(&Transaction::Legacy(tx.clone()), 1).unwrap();
    let (r, s, bit) = sign_prehash(key, hash);
    tx.v = U256::from(27 + bit as u64);
    tx.r = r;
    tx.s = s;
    Transaction::Legacy(tx)
}

fn sign_blob(mut tx: BlobTx, key: &SigningKey) -> Transaction {
    let hash = signing_hash(&Transaction::Blob(tx.clone()), tx.chain_id).unwrap();
    let (r, s, bit) = sign_prehash(key, hash);
    tx.y_parity = bit;
    tx.r = r;
    tx.s = s;
    Transaction::Blob(tx)
}

fn genesis_header(fork: Fork) -> Header {
    Header {
        number: 0,
        gas_limit: 30_000_000,
        gas_used: 15_000_000,
        timestamp: 0,
        base_fee_per_gas: fork.eip(1559).then_some(10 * GWEI as u64),
        ..Default::default()
    }
}

fn new_chain(fork: Fork, state: State) -> BlockChain {
    let genesis =
        Block { header: genesis_header(fork), ..Default::default() };
    BlockChain::new(ChainSpec::single(1, fork), genesis, state)
}

fn block_env_for(chain: &BlockChain, header: &Header) -> BlockEnv {
    let fork = chain.chain_spec.fork_at(header.number, header.timestamp);
    BlockEnv {
        fork,
        chain_id: chain.chain_spec.chain_id,
        number: header.number,
        coinbase: header.coinbase,
        timestamp: header.timestamp,
        prev_randao: header.prev_randao,
        difficulty: header.difficulty,
        gas_limit: header.gas_limit,
        base_fee_per_gas: header.base_fee_per_gas,
        excess_blob_gas: header.excess_blob_gas,
        parent_beacon_block_root: header.parent_beacon_block_root,
        block_hashes: chain.blocks().iter().map(|block| block.header.hash()).collect(),
    }
}

/// Builds a candidate header on top of the chain for the given fork.
fn candidate_header(chain: &BlockChain) -> Header {
    let parent = &chain.latest_block().header;
    let fork = chain.chain_spec.fork_at(parent.number + 1, parent.timestamp + 12);
    let mut header = Header {
        parent_hash: parent.hash(),
        ommers_hash: keccak256([alloy_rlp::EMPTY_LIST_CODE]),
        coinbase: Address::with_last_byte(0xcb),
        number: parent.number + 1,
        gas_limit: parent.gas_limit,
        timestamp: parent.timestamp + 12,
        ..Default::default()
    };
    if fork.eip(1559) {
        header.base_fee_per_gas = Some(
            silex_executor::calculate_base_fee_per_gas(
                header.gas_limit,
                parent.gas_limit,
                parent.gas_used,
                parent.base_fee_per_gas.unwrap_or(silex_executor::INITIAL_BASE_FEE),
            )
            .unwrap(),
        );
    }
    if fork.eip(4844) {
        header.excess_blob_gas =
            Some(silex_executor::calculate_excess_blob_gas(fork, parent));
        header.blob_gas_used = Some(0);
    }
    if fork.eip(4788) {
        header.parent_beacon_block_root = Some(B256::ZERO);
    }
    header
}

/// Executes the body on a scratch state and fills the header's roots,
/// producing a block the chain should accept.
fn seal(chain: &BlockChain, header: Header, transactions: Vec<Transaction>) -> Block {
    seal_with_withdrawals(chain, header, transactions, Vec::new())
}

fn seal_with_withdrawals(
    chain: &BlockChain,
    mut header: Header,
    transactions: Vec<Transaction>,
    withdrawals: Vec<Withdrawal>,
) -> Block {
    let fork = chain.chain_spec.fork_at(header.number, header.timestamp);
    let block_env = block_env_for(chain, &header);
    let withdrawals = fork.eip(4895).then_some(withdrawals);

    let mut state = chain.state.clone();
    let output =
        apply_body(&mut state, &block_env, &transactions, &[], withdrawals.as_deref())
            .expect("sealing executes a valid body");

    header.gas_used = output.block_gas_used;
    header.transactions_root = output.transactions_trie.root();
    header.receipt_root = output.receipts_trie.root();
    header.bloom = logs_bloom(output.block_logs.iter());
    if fork.eip(4895) {
        header.withdrawals_root = Some(output.withdrawals_trie.root());
    }
    if fork.eip(4844) {
        header.blob_gas_used = Some(output.blob_gas_used);
    }
    if fork.eip(7685) {
        header.requests_hash = Some(compute_requests_hash(&output.requests));
    }
    header.state_root = state.state_root();

    Block { header, transactions, ommers: vec![], withdrawals }
}

#[test]
fn test_plain_transfer_london() {
    let key = test_key();
    let alice = key_address(&key);
    let bob = Address::with_last_byte(0xb0);

    let mut state = State::new();
    state.set_account(
        alice,
        Some(Account { balance: U256::from(10u64) * U256::from(ETHER), ..Default::default() }),
    );
    let mut chain = new_chain(Fork::London, state);

    let tx = sign_legacy(
        LegacyTx {
            nonce: 0,
            gas_price: 10 * GWEI,
            gas: 21_000,
            to: TxKind::Call(bob),
            value: U256::from(ETHER),
            data: Bytes::new(),
            ..Default::default()
        },
        &key,
    );

    let block = seal(&chain, candidate_header(&chain), vec![tx]);
    assert_eq!(block.header.gas_used, 21_000);
    chain.state_transition(block).unwrap();

    let gas_fee = U256::from(21_000u64) * U256::from(10 * GWEI);
    assert_eq!(
        chain.state.get_account(alice).balance,
        U256::from(10u64) * U256::from(ETHER) - U256::from(ETHER) - gas_fee,
    );
    assert_eq!(chain.state.get_account(bob).balance, U256::from(ETHER));
    assert_eq!(chain.state.get_account(alice).nonce, 1);
    // The priority fee is zero, so the coinbase earns nothing (the base
    // fee is burned).
    assert!(!chain.state.account_exists(Address::with_last_byte(0xcb)));
    assert_eq!(chain.blocks().len(), 2);
}

#[test]
fn test_sstore_refund_reversal_berlin() {
    let key = test_key();
    let alice = key_address(&key);
    let contract = Address::with_last_byte(0xc0);
    let slot = B256::with_last_byte(0x01);

    // SSTORE(1, 0) then SSTORE(1, 5).
    let code = Bytes::from_static(&[
        0x60, 0x00, 0x60, 0x01, 0x55, 0x60, 0x05, 0x60, 0x01, 0x55, 0x00,
    ]);
    let mut state = State::new();
    state.set_account(
        alice,
        Some(Account { balance: U256::from(ETHER), ..Default::default() }),
    );
    state.set_account(contract, Some(Account { code, nonce: 1, ..Default::default() }));
    state.set_storage(contract, slot, U256::from(3));
    let mut chain = new_chain(Fork::Berlin, state);

    let tx = sign_legacy(
        LegacyTx {
            nonce: 0,
            gas_price: GWEI,
            gas: 100_000,
            to: TxKind::Call(contract),
            ..Default::default()
        },
        &key,
    );

    let block = seal(&chain, candidate_header(&chain), vec![tx]);
    // Cold slot clear (2100 + 2900, +4800 refund) then warm dirty
    // re-set (100, −4800 refund): the refunds cancel exactly.
    assert_eq!(block.header.gas_used, 21_000 + 2_100 + 2_900 + 3 * 4 + 100);
    chain.state_transition(block).unwrap();

    assert_eq!(chain.state.get_storage(contract, slot), U256::from(5));
}

#[test]
fn test_bad_state_root_rolls_back() {
    let key = test_key();
    let alice = key_address(&key);

    let mut state = State::new();
    state.set_account(
        alice,
        Some(Account { balance: U256::from(10u64) * U256::from(ETHER), ..Default::default() }),
    );
    let mut chain = new_chain(Fork::London, state);
    let pre_root = chain.state.state_root();

    let tx = sign_legacy(
        LegacyTx {
            nonce: 0,
            gas_price: 10 * GWEI,
            gas: 21_000,
            to: TxKind::Call(Address::with_last_byte(0xb0)),
            value: U256::from(ETHER),
            ..Default::default()
        },
        &key,
    );

    let mut block = seal(&chain, candidate_header(&chain), vec![tx]);
    let mut corrupted = block.header.state_root.0;
    corrupted[0] ^= 0x01;
    block.header.state_root = B256::from(corrupted);

    assert_eq!(chain.state_transition(block), Err(InvalidBlock::InvalidStateRoot));
    // The chain is byte-identical to its pre-call state.
    assert_eq!(chain.state.state_root(), pre_root);
    assert_eq!(chain.blocks().len(), 1);
}

#[test]
fn test_gas_used_mismatch_rejected() {
    let mut chain = new_chain(Fork::London, State::new());
    let mut block = seal(&chain, candidate_header(&chain), vec![]);
    block.header.gas_used = 1;
    // Recompute nothing else: the mismatch must surface.
    assert_eq!(chain.state_transition(block), Err(InvalidBlock::InvalidGasUsed));
}

#[test]
fn test_invalid_parent_hash_rejected() {
    let mut chain = new_chain(Fork::London, State::new());
    let mut header = candidate_header(&chain);
    header.parent_hash = B256::with_last_byte(0x99);
    let block = seal(&chain, header, vec![]);
    assert_eq!(chain.state_transition(block), Err(InvalidBlock::InvalidParentHash));
}

fn preflight_env(fork: Fork) -> BlockEnv {
    BlockEnv {
        fork,
        chain_id: 1,
        number: 1,
        coinbase: Address::with_last_byte(0xcb),
        timestamp: 12,
        prev_randao: B256::ZERO,
        difficulty: U256::ZERO,
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(10 * GWEI as u64),
        excess_blob_gas: fork.eip(4844).then_some(0),
        parent_beacon_block_root: None,
        block_hashes: vec![],
    }
}

fn funded_state(address: Address) -> State {
    let mut state = State::new();
    state.set_account(
        address,
        Some(Account { balance: U256::from(100u64) * U256::from(ETHER), ..Default::default() }),
    );
    state
}

#[test]
fn test_intrinsic_gas_boundary() {
    let key = test_key();
    let state = funded_state(key_address(&key));
    let env = preflight_env(Fork::London);

    let exact = sign_legacy(
        LegacyTx {
            gas_price: 10 * GWEI,
            gas: 21_000,
            to: TxKind::Call(Address::with_last_byte(1)),
            ..Default::default()
        },
        &key,
    );
    assert!(check_transaction(&state, &env, &BlockOutput::default(), &exact).is_ok());

    let short = sign_legacy(
        LegacyTx {
            gas_price: 10 * GWEI,
            gas: 20_999,
            to: TxKind::Call(Address::with_last_byte(1)),
            ..Default::default()
        },
        &key,
    );
    assert_eq!(
        check_transaction(&state, &env, &BlockOutput::default(), &short),
        Err(InvalidTransaction::InsufficientIntrinsicGas),
    );
}

#[test]
fn test_nonce_overflow_rejected() {
    let key = test_key();
    let state = funded_state(key_address(&key));
    let env = preflight_env(Fork::London);

    let tx = sign_legacy(
        LegacyTx {
            nonce: u64::MAX,
            gas_price: 10 * GWEI,
            gas: 21_000,
            to: TxKind::Call(Address::with_last_byte(1)),
            ..Default::default()
        },
        &key,
    );
    assert_eq!(
        check_transaction(&state, &env, &BlockOutput::default(), &tx),
        Err(InvalidTransaction::NonceOverflow),
    );
}

#[test]
fn test_blob_count_bounds_prague() {
    let key = test_key();
    let state = funded_state(key_address(&key));
    let env = preflight_env(Fork::Prague);

    let blob_tx = |count: usize| {
        sign_blob(
            BlobTx {
                chain_id: 1,
                nonce: 0,
                max_priority_fee_per_gas: GWEI,
                max_fee_per_gas: 20 * GWEI,
                gas: 100_000,
                to: Address::with_last_byte(1),
                max_fee_per_blob_gas: GWEI,
                blob_versioned_hashes: (0..count)
                    .map(|_| {
                        let mut hash = B256::ZERO;
                        hash.0[0] = 0x01;
                        hash
                    })
                    .collect(),
                ..Default::default()
            },
            &key,
        )
    };

    assert!(check_transaction(&state, &env, &BlockOutput::default(), &blob_tx(9)).is_ok());
    assert_eq!(
        check_transaction(&state, &env, &BlockOutput::default(), &blob_tx(10)),
        Err(InvalidTransaction::TooManyBlobs),
    );
    assert_eq!(
        check_transaction(&state, &env, &BlockOutput::default(), &blob_tx(0)),
        Err(InvalidTransaction::NoBlobData),
    );
}

#[test]
fn test_type_gating_pre_berlin() {
    let key = test_key();
    let state = funded_state(key_address(&key));
    let env = preflight_env(Fork::Istanbul);

    let tx = Transaction::AccessList(silex_primitives::AccessListTx {
        chain_id: 1,
        gas: 30_000,
        to: TxKind::Call(Address::with_last_byte(1)),
        gas_price: 10 * GWEI,
        ..Default::default()
    });
    assert_eq!(
        check_transaction(&state, &env, &BlockOutput::default(), &tx),
        Err(InvalidTransaction::TypeNotSupported(0x01)),
    );
}

#[test]
fn test_block_capacity_enforced() {
    let key = test_key();
    let state = funded_state(key_address(&key));
    let env = preflight_env(Fork::London);

    let output = BlockOutput { block_gas_used: 30_000_000 - 20_000, ..Default::default() };
    let tx = sign_legacy(
        LegacyTx {
            gas_price: 10 * GWEI,
            gas: 21_000,
            to: TxKind::Call(Address::with_last_byte(1)),
            ..Default::default()
        },
        &key,
    );
    assert_eq!(
        check_transaction(&state, &env, &output, &tx),
        Err(InvalidTransaction::GasAllowanceExceeded),
    );
}

#[test]
fn test_ether_conservation_with_burn() {
    let key = test_key();
    let alice = key_address(&key);
    let initial = U256::from(10u64) * U256::from(ETHER);

    let mut state = State::new();
    state.set_account(alice, Some(Account { balance: initial, ..Default::default() }));
    let mut chain = new_chain(Fork::London, state);

    let tx = sign_legacy(
        LegacyTx {
            nonce: 0,
            gas_price: 11 * GWEI,
            gas: 21_000,
            to: TxKind::Call(Address::with_last_byte(0xb0)),
            value: U256::from(ETHER),
            ..Default::default()
        },
        &key,
    );
    let block = seal(&chain, candidate_header(&chain), vec![tx]);
    let base_fee = block.header.base_fee_per_gas.unwrap();
    chain.state_transition(block).unwrap();

    let total: U256 = [
        chain.state.get_account(alice).balance,
        chain.state.get_account(Address::with_last_byte(0xb0)).balance,
        chain.state.get_account(Address::with_last_byte(0xcb)).balance,
    ]
    .into_iter()
    .fold(U256::ZERO, |acc, balance| acc + balance);

    // London burns exactly base_fee · gas_used.
    let burned = U256::from(base_fee) * U256::from(21_000u64);
    assert_eq!(total, initial - burned);
}

#[test]
fn test_withdrawals_credit_gwei_as_wei() {
    let mut chain = new_chain(Fork::Shanghai, State::new());
    let recipient = Address::with_last_byte(0xaa);

    let withdrawal =
        Withdrawal { index: 0, validator_index: 7, address: recipient, amount: 3 };
    let block = seal_with_withdrawals(
        &chain,
        candidate_header(&chain),
        vec![],
        vec![withdrawal],
    );
    chain.state_transition(block).unwrap();

    assert_eq!(
        chain.state.get_account(recipient).balance,
        U256::from(3_000_000_000u64),
    );
}

#[rstest]
#[case(Fork::Homestead, 5)]
#[case(Fork::Byzantium, 3)]
#[case(Fork::Constantinople, 2)]
fn test_block_reward_schedule(#[case] fork: Fork, #[case] reward_ether: u64) {
    let mut chain = new_chain(fork, State::new());
    let block = seal(&chain, candidate_header(&chain), vec![]);
    chain.state_transition(block).unwrap();

    assert_eq!(
        chain.state.get_account(Address::with_last_byte(0xcb)).balance,
        U256::from(reward_ether) * U256::from(ETHER),
    );
}

#[test]
fn test_gas_limit_cap_osaka() {
    let key = test_key();
    let state = funded_state(key_address(&key));
    let env = preflight_env(Fork::Osaka);

    let tx = sign_legacy(
        LegacyTx {
            gas_price: 10 * GWEI,
            gas: gas::TX_GAS_LIMIT_CAP + 1,
            to: TxKind::Call(Address::with_last_byte(1)),
            ..Default::default()
        },
        &key,
    );
    assert_eq!(
        check_transaction(&state, &env, &BlockOutput::default(), &tx),
        Err(InvalidTransaction::GasLimitCapExceeded),
    );
}
