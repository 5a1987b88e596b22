//! The frame execution drivers: the opcode loop and the call/create
//! lifecycles with their snapshot discipline.

use crate::{
    env::{BlockEnv, TxEnv},
    gas::{GAS_CODE_DEPOSIT, MAX_CODE_SIZE},
    message::set_delegation,
    opcodes::{self, Opcode},
    precompiles, Evm, Message, VmError,
};
use alloc::{collections::BTreeSet, vec::Vec};
use alloy_primitives::{Address, Bytes, TxKind};
use silex_primitives::Log;
use silex_state::State;
use tracing::debug;

/// The protocol call-depth limit.
pub(crate) const STACK_DEPTH_LIMIT: usize = 1024;

/// The outcome of one transaction's EVM execution.
#[derive(Debug)]
pub struct MessageCallOutput {
    /// Gas remaining after execution.
    pub gas_left: u64,
    /// Accumulated SSTORE/authorization refunds.
    pub refund_counter: u64,
    /// Logs emitted, empty if the outer frame failed.
    pub logs: Vec<Log>,
    /// Accounts queued for destruction, empty if the outer frame failed.
    pub accounts_to_delete: BTreeSet<Address>,
    /// Touched accounts for the EIP-161 sweep, empty if the outer frame
    /// failed.
    pub touched_accounts: BTreeSet<Address>,
    /// The halting condition of the outer frame, if any.
    pub error: Option<VmError>,
    /// The outer frame's output buffer (revert data on REVERT).
    pub return_data: Bytes,
}

/// Runs one transaction's message against the state.
///
/// Applies any EIP-7702 authorizations, routes to the call or create
/// lifecycle, and folds the outer frame into a [MessageCallOutput]. A
/// failed outer frame contributes no logs or bookkeeping sets, but its
/// gas and revert data survive.
pub fn process_message_call(
    block_env: &BlockEnv,
    tx_env: &TxEnv,
    state: &mut State,
    mut message: Message,
) -> MessageCallOutput {
    let mut refund_counter = 0u64;
    if !message.authorizations.is_empty() {
        refund_counter += set_delegation(state, &mut message, block_env.chain_id);
    }

    let evm = if message.target == TxKind::Create {
        if state.account_has_code_or_nonce(message.current_target)
            || state.account_has_storage(message.current_target)
        {
            debug!(
                target: "evm",
                address = %message.current_target,
                "create collision at transaction level"
            );
            return MessageCallOutput {
                gas_left: 0,
                refund_counter,
                logs: Vec::new(),
                accounts_to_delete: BTreeSet::new(),
                touched_accounts: BTreeSet::new(),
                error: Some(VmError::AddressCollision),
                return_data: Bytes::new(),
            };
        }
        process_create_message(block_env, tx_env, state, message)
    } else {
        let mut evm = process_message(block_env, tx_env, state, message);
        if state.account_exists_and_is_empty(evm.message.current_target) {
            evm.touched_accounts.insert(evm.message.current_target);
        }
        evm
    };

    if evm.error.is_some() {
        MessageCallOutput {
            gas_left: evm.gas_left,
            refund_counter,
            logs: Vec::new(),
            accounts_to_delete: BTreeSet::new(),
            touched_accounts: BTreeSet::new(),
            error: evm.error,
            return_data: evm.output,
        }
    } else {
        MessageCallOutput {
            gas_left: evm.gas_left,
            refund_counter: refund_counter + evm.refund_counter.max(0) as u64,
            logs: evm.logs,
            accounts_to_delete: evm.accounts_to_delete,
            touched_accounts: evm.touched_accounts,
            error: None,
            return_data: evm.output,
        }
    }
}

/// Runs a call-flavored message under its own snapshot: value moves,
/// code executes, and the snapshot commits or rolls back with the
/// frame's outcome.
pub fn process_message<'env>(
    block_env: &'env BlockEnv,
    tx_env: &'env TxEnv,
    state: &mut State,
    message: Message,
) -> Evm<'env> {
    state.begin_transaction();
    state.touch_account(message.current_target);

    if message.should_transfer_value && !message.value.is_zero() {
        // The call machinery and the pre-flight both verify the caller's
        // balance before a frame is spawned.
        state
            .move_ether(message.caller, message.current_target, message.value)
            .expect("caller balance was checked before dispatch");
    }

    let evm = execute_code(block_env, tx_env, state, message);
    if evm.error.is_some() {
        state.rollback_transaction();
    } else {
        state.commit_transaction();
    }
    evm
}

/// Runs a create-flavored message: clears any stale storage at the
/// destination, marks it created for EIP-6780, runs the init code, and
/// deposits the returned runtime code.
pub fn process_create_message<'env>(
    block_env: &'env BlockEnv,
    tx_env: &'env TxEnv,
    state: &mut State,
    message: Message,
) -> Evm<'env> {
    let fork = block_env.fork;
    let contract_address = message.current_target;

    state.begin_transaction();
    // A prior incarnation may have left storage behind (EIP-7610 keeps
    // such creates from succeeding at the collision check; the clear
    // here covers the pre-check forks).
    state.destroy_storage(contract_address);
    state.mark_account_created(contract_address);
    if fork.eip(161) {
        state.increment_nonce(contract_address);
    }

    let mut evm = process_message(block_env, tx_env, state, message);
    if evm.error.is_none() {
        let contract_code = evm.output.clone();
        match charge_code_deposit(&mut evm, &contract_code) {
            Ok(deposited_code) => {
                state.set_code(contract_address, deposited_code);
                state.commit_transaction();
            }
            Err(error) => {
                state.rollback_transaction();
                evm.gas_left = 0;
                evm.output = Bytes::new();
                evm.error = Some(error);
            }
        }
    } else {
        state.rollback_transaction();
    }
    evm
}

/// Validates and pays for the runtime code returned by init code.
///
/// Frontier's quirk survives here: when the deposit charge itself is
/// unaffordable pre-Homestead, the contract is created with empty code
/// instead of failing.
fn charge_code_deposit(evm: &mut Evm<'_>, contract_code: &Bytes) -> Result<Bytes, VmError> {
    let fork = evm.fork();
    if fork.eip(3541) && contract_code.first() == Some(&0xef) {
        return Err(VmError::InvalidContractPrefix);
    }
    if fork.eip(170) && contract_code.len() > MAX_CODE_SIZE {
        return Err(VmError::OutOfGas);
    }

    let deposit_cost = GAS_CODE_DEPOSIT * contract_code.len() as u64;
    match evm.charge_gas(deposit_cost) {
        Ok(()) => Ok(contract_code.clone()),
        Err(error) if fork.eip(2) => Err(error),
        Err(_) => Ok(Bytes::new()),
    }
}

/// The opcode loop. Dispatches precompiles directly; otherwise decodes
/// and executes one instruction at a time until the frame halts.
pub(crate) fn execute_code<'env>(
    block_env: &'env BlockEnv,
    tx_env: &'env TxEnv,
    state: &mut State,
    message: Message,
) -> Evm<'env> {
    let mut evm = Evm::new(block_env, tx_env, message);

    if let Some(code_address) = evm.message.code_address {
        if !evm.message.disable_precompiles
            && precompiles::is_precompile(code_address, evm.fork())
        {
            if let Err(error) = precompiles::dispatch(&mut evm, code_address) {
                evm.gas_left = 0;
                evm.output = Bytes::new();
                evm.error = Some(error);
            }
            return evm;
        }
    }

    while evm.running && evm.pc < evm.message.code.len() {
        let byte = evm.message.code[evm.pc];
        let result = match Opcode::from_byte(byte, evm.fork()) {
            Some(op) => opcodes::execute(&mut evm, state, op),
            None => Err(VmError::InvalidOpcode(byte)),
        };
        if let Err(error) = result {
            if error.consumes_all_gas() {
                evm.gas_left = 0;
                evm.output = Bytes::new();
            }
            evm.error = Some(error);
            break;
        }
    }
    evm
}
