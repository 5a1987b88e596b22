//! The call and create families, frame-halting instructions, and
//! SELFDESTRUCT.

use crate::{
    gas::{
        self, GAS_CREATE, GAS_KECCAK256_WORD, GAS_NEW_ACCOUNT, GAS_SELF_DESTRUCT_NEW_ACCOUNT,
        GAS_CALL_VALUE, GAS_ZERO, MAX_INIT_CODE_SIZE, REFUND_SELF_DESTRUCT,
    },
    interpreter::{process_create_message, process_message, STACK_DEPTH_LIMIT},
    message::{compute_contract_address, compute_create2_contract_address},
    Evm, Message, VmError, VmResult,
};
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use silex_primitives::delegation_target;
use silex_state::State;

fn address_from_word(word: U256) -> Address {
    Address::from_slice(&word.to_be_bytes::<32>()[12..])
}

/// Loads the code executing on behalf of `target`, following an
/// EIP-7702 delegation designation (and paying the extra account access
/// it implies).
///
/// Returns `(disable_precompiles, code_address, code, extra_access_cost)`.
fn resolve_code(
    evm: &mut Evm<'_>,
    state: &State,
    target: Address,
) -> (bool, Address, Bytes, u64) {
    let code = state.get_code(target);
    if evm.fork().eip(7702) {
        if let Some(delegate) = delegation_target(&code) {
            let access_cost = if evm.fork().eip(2929) { evm.access_account(delegate) } else { 0 };
            return (true, delegate, state.get_code(delegate), access_cost);
        }
    }
    (false, target, code, 0)
}

/// The shared inputs of the call family, after each variant has popped
/// and priced its operands.
struct CallParams {
    gas: u64,
    value: U256,
    caller: Address,
    to: Address,
    code_address: Address,
    code: Bytes,
    should_transfer_value: bool,
    is_staticcall: bool,
    disable_precompiles: bool,
    memory_input_start: U256,
    memory_input_size: U256,
    memory_output_start: U256,
    memory_output_size: U256,
}

/// Spawns a child call frame and absorbs its outcome: push the success
/// flag, capture return data, and copy the prefix that fits into the
/// caller's output region.
fn generic_call(evm: &mut Evm<'_>, state: &mut State, params: CallParams) -> VmResult<()> {
    evm.return_data = Bytes::new();

    if evm.message.depth + 1 > STACK_DEPTH_LIMIT {
        evm.gas_left += params.gas;
        evm.stack.push(U256::ZERO)?;
        return Ok(());
    }

    let call_data = if params.memory_input_size.is_zero() {
        Bytes::new()
    } else {
        let start = usize::try_from(params.memory_input_start).expect("memory was extended");
        let size = usize::try_from(params.memory_input_size).expect("memory was extended");
        evm.memory.read(start, size)
    };

    let child_message = Message {
        caller: params.caller,
        target: TxKind::Call(params.to),
        current_target: params.to,
        gas: params.gas,
        value: params.value,
        data: call_data,
        code: params.code,
        code_address: Some(params.code_address),
        depth: evm.message.depth + 1,
        should_transfer_value: params.should_transfer_value,
        is_static: params.is_staticcall || evm.message.is_static,
        accessed_addresses: evm.message.accessed_addresses.clone(),
        accessed_storage_keys: evm.message.accessed_storage_keys.clone(),
        disable_precompiles: params.disable_precompiles,
        accounts_to_delete: evm.accounts_to_delete.clone(),
        authorizations: alloc::vec::Vec::new(),
    };

    let block = evm.block;
    let tx = evm.tx;
    let child = process_message(block, tx, state, child_message);

    let output = child.output.clone();
    if child.error.is_some() {
        evm.incorporate_child_on_error(child, state);
        evm.return_data = output;
        evm.stack.push(U256::ZERO)?;
    } else {
        evm.incorporate_child_on_success(child, state);
        evm.return_data = output;
        evm.stack.push(U256::from(1))?;
    }

    let copy_size = params
        .memory_output_size
        .min(U256::from(evm.return_data.len()));
    if !copy_size.is_zero() {
        let start = usize::try_from(params.memory_output_start).expect("memory was extended");
        let copy_size = usize::try_from(copy_size).expect("bounded by output size");
        let prefix = evm.return_data.slice(..copy_size);
        evm.memory.write(start, &prefix);
    }
    Ok(())
}

pub(crate) fn call(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let requested_gas = evm.stack.pop()?;
    let to = address_from_word(evm.stack.pop()?);
    let value = evm.stack.pop()?;
    let memory_input_start = evm.stack.pop()?;
    let memory_input_size = evm.stack.pop()?;
    let memory_output_start = evm.stack.pop()?;
    let memory_output_size = evm.stack.pop()?;

    let fork = evm.fork();
    let extend = gas::calculate_gas_extend_memory(
        evm.memory.len(),
        &[(memory_input_start, memory_input_size), (memory_output_start, memory_output_size)],
    )?;

    let mut access_cost = if fork.eip(2929) {
        evm.access_account(to)
    } else {
        gas::call_base_cost(fork)
    };
    let (disable_precompiles, code_address, code, delegation_cost) =
        resolve_code(evm, state, to);
    access_cost += delegation_cost;

    let target_needs_creation = if fork.eip(161) {
        !state.is_account_alive(to)
    } else {
        !state.account_exists(to)
    };
    let create_gas_cost =
        if !value.is_zero() && target_needs_creation { GAS_NEW_ACCOUNT } else { 0 };
    let transfer_gas_cost = if value.is_zero() { 0 } else { GAS_CALL_VALUE };

    let message_call_gas = gas::calculate_message_call_gas(
        fork,
        value,
        requested_gas,
        evm.gas_left,
        extend.cost,
        access_cost + create_gas_cost + transfer_gas_cost,
    );
    evm.charge_gas(message_call_gas.cost.saturating_add(extend.cost))?;
    if evm.message.is_static && !value.is_zero() {
        return Err(VmError::WriteInStaticContext);
    }
    evm.memory.extend(extend.expand_by);

    if state.get_account(evm.message.current_target).balance < value {
        evm.gas_left += message_call_gas.sub_call;
        evm.return_data = Bytes::new();
        evm.stack.push(U256::ZERO)?;
        evm.pc += 1;
        return Ok(());
    }

    generic_call(
        evm,
        state,
        CallParams {
            gas: message_call_gas.sub_call,
            value,
            caller: evm.message.current_target,
            to,
            code_address,
            code,
            should_transfer_value: true,
            is_staticcall: false,
            disable_precompiles,
            memory_input_start,
            memory_input_size,
            memory_output_start,
            memory_output_size,
        },
    )?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn callcode(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let requested_gas = evm.stack.pop()?;
    let code_target = address_from_word(evm.stack.pop()?);
    let value = evm.stack.pop()?;
    let memory_input_start = evm.stack.pop()?;
    let memory_input_size = evm.stack.pop()?;
    let memory_output_start = evm.stack.pop()?;
    let memory_output_size = evm.stack.pop()?;

    let fork = evm.fork();
    let to = evm.message.current_target;
    let extend = gas::calculate_gas_extend_memory(
        evm.memory.len(),
        &[(memory_input_start, memory_input_size), (memory_output_start, memory_output_size)],
    )?;

    let mut access_cost = if fork.eip(2929) {
        evm.access_account(code_target)
    } else {
        gas::call_base_cost(fork)
    };
    let (disable_precompiles, code_address, code, delegation_cost) =
        resolve_code(evm, state, code_target);
    access_cost += delegation_cost;

    let transfer_gas_cost = if value.is_zero() { 0 } else { GAS_CALL_VALUE };
    let message_call_gas = gas::calculate_message_call_gas(
        fork,
        value,
        requested_gas,
        evm.gas_left,
        extend.cost,
        access_cost + transfer_gas_cost,
    );
    evm.charge_gas(message_call_gas.cost.saturating_add(extend.cost))?;
    evm.memory.extend(extend.expand_by);

    if state.get_account(evm.message.current_target).balance < value {
        evm.gas_left += message_call_gas.sub_call;
        evm.return_data = Bytes::new();
        evm.stack.push(U256::ZERO)?;
        evm.pc += 1;
        return Ok(());
    }

    generic_call(
        evm,
        state,
        CallParams {
            gas: message_call_gas.sub_call,
            value,
            caller: evm.message.current_target,
            to,
            code_address,
            code,
            should_transfer_value: true,
            is_staticcall: false,
            disable_precompiles,
            memory_input_start,
            memory_input_size,
            memory_output_start,
            memory_output_size,
        },
    )?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn delegatecall(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let requested_gas = evm.stack.pop()?;
    let code_target = address_from_word(evm.stack.pop()?);
    let memory_input_start = evm.stack.pop()?;
    let memory_input_size = evm.stack.pop()?;
    let memory_output_start = evm.stack.pop()?;
    let memory_output_size = evm.stack.pop()?;

    let fork = evm.fork();
    let extend = gas::calculate_gas_extend_memory(
        evm.memory.len(),
        &[(memory_input_start, memory_input_size), (memory_output_start, memory_output_size)],
    )?;

    let mut access_cost = if fork.eip(2929) {
        evm.access_account(code_target)
    } else {
        gas::call_base_cost(fork)
    };
    let (disable_precompiles, code_address, code, delegation_cost) =
        resolve_code(evm, state, code_target);
    access_cost += delegation_cost;

    let message_call_gas = gas::calculate_message_call_gas(
        fork,
        U256::ZERO,
        requested_gas,
        evm.gas_left,
        extend.cost,
        access_cost,
    );
    evm.charge_gas(message_call_gas.cost.saturating_add(extend.cost))?;
    evm.memory.extend(extend.expand_by);

    generic_call(
        evm,
        state,
        CallParams {
            gas: message_call_gas.sub_call,
            value: evm.message.value,
            caller: evm.message.caller,
            to: evm.message.current_target,
            code_address,
            code,
            should_transfer_value: false,
            is_staticcall: false,
            disable_precompiles,
            memory_input_start,
            memory_input_size,
            memory_output_start,
            memory_output_size,
        },
    )?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn staticcall(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let requested_gas = evm.stack.pop()?;
    let to = address_from_word(evm.stack.pop()?);
    let memory_input_start = evm.stack.pop()?;
    let memory_input_size = evm.stack.pop()?;
    let memory_output_start = evm.stack.pop()?;
    let memory_output_size = evm.stack.pop()?;

    let fork = evm.fork();
    let extend = gas::calculate_gas_extend_memory(
        evm.memory.len(),
        &[(memory_input_start, memory_input_size), (memory_output_start, memory_output_size)],
    )?;

    let mut access_cost = if fork.eip(2929) {
        evm.access_account(to)
    } else {
        gas::call_base_cost(fork)
    };
    let (disable_precompiles, code_address, code, delegation_cost) =
        resolve_code(evm, state, to);
    access_cost += delegation_cost;

    let message_call_gas = gas::calculate_message_call_gas(
        fork,
        U256::ZERO,
        requested_gas,
        evm.gas_left,
        extend.cost,
        access_cost,
    );
    evm.charge_gas(message_call_gas.cost.saturating_add(extend.cost))?;
    evm.memory.extend(extend.expand_by);

    generic_call(
        evm,
        state,
        CallParams {
            gas: message_call_gas.sub_call,
            value: U256::ZERO,
            caller: evm.message.current_target,
            to,
            code_address,
            code,
            should_transfer_value: false,
            is_staticcall: true,
            disable_precompiles,
            memory_input_start,
            memory_input_size,
            memory_output_start,
            memory_output_size,
        },
    )?;
    evm.pc += 1;
    Ok(())
}

/// Spawns a child create frame: collision checks, nonce bookkeeping,
/// and init-code execution.
fn generic_create(
    evm: &mut Evm<'_>,
    state: &mut State,
    endowment: U256,
    contract_address: Address,
    memory_start: U256,
    memory_size: U256,
) -> VmResult<()> {
    let fork = evm.fork();

    let init_code = if memory_size.is_zero() {
        Bytes::new()
    } else {
        let start = usize::try_from(memory_start).expect("memory was extended");
        let size = usize::try_from(memory_size).expect("memory was extended");
        evm.memory.read(start, size)
    };
    if fork.eip(3860) && init_code.len() > MAX_INIT_CODE_SIZE {
        return Err(VmError::OutOfGas);
    }

    let create_message_gas =
        if fork.eip(150) { gas::max_message_call_gas(evm.gas_left) } else { evm.gas_left };
    evm.gas_left -= create_message_gas;
    if evm.message.is_static {
        return Err(VmError::WriteInStaticContext);
    }
    evm.return_data = Bytes::new();

    let sender_address = evm.message.current_target;
    let sender = state.get_account(sender_address);
    if sender.balance < endowment
        || sender.nonce == u64::MAX
        || evm.message.depth + 1 > STACK_DEPTH_LIMIT
    {
        evm.gas_left += create_message_gas;
        evm.stack.push(U256::ZERO)?;
        return Ok(());
    }

    if state.account_has_code_or_nonce(contract_address)
        || state.account_has_storage(contract_address)
    {
        // The sender's nonce still burns, and so does the child gas.
        state.increment_nonce(sender_address);
        evm.stack.push(U256::ZERO)?;
        return Ok(());
    }

    state.increment_nonce(sender_address);

    let child_message = Message {
        caller: sender_address,
        target: TxKind::Create,
        current_target: contract_address,
        gas: create_message_gas,
        value: endowment,
        data: Bytes::new(),
        code: init_code,
        code_address: None,
        depth: evm.message.depth + 1,
        should_transfer_value: true,
        is_static: false,
        accessed_addresses: evm.message.accessed_addresses.clone(),
        accessed_storage_keys: evm.message.accessed_storage_keys.clone(),
        disable_precompiles: false,
        accounts_to_delete: evm.accounts_to_delete.clone(),
        authorizations: alloc::vec::Vec::new(),
    };

    let block = evm.block;
    let tx = evm.tx;
    let child = process_create_message(block, tx, state, child_message);

    if child.error.is_some() {
        let output = child.output.clone();
        evm.incorporate_child_on_error(child, state);
        evm.return_data = output;
        evm.stack.push(U256::ZERO)?;
    } else {
        evm.incorporate_child_on_success(child, state);
        evm.return_data = Bytes::new();
        evm.stack.push(U256::from_be_slice(contract_address.as_slice()))?;
    }
    Ok(())
}

pub(crate) fn create(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let endowment = evm.stack.pop()?;
    let memory_start = evm.stack.pop()?;
    let memory_size = evm.stack.pop()?;

    let fork = evm.fork();
    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, memory_size)])?;
    let init_code_gas = if fork.eip(3860) {
        gas::init_code_cost(u64::try_from(memory_size).map_err(|_| VmError::OutOfGas)? as usize)
    } else {
        0
    };
    evm.charge_gas(GAS_CREATE + init_code_gas + extend.cost)?;
    evm.memory.extend(extend.expand_by);

    let contract_address = compute_contract_address(
        evm.message.current_target,
        state.get_account(evm.message.current_target).nonce,
    );
    if fork.eip(2929) {
        evm.message.accessed_addresses.insert(contract_address);
    }

    generic_create(evm, state, endowment, contract_address, memory_start, memory_size)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn create2(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let endowment = evm.stack.pop()?;
    let memory_start = evm.stack.pop()?;
    let memory_size = evm.stack.pop()?;
    let salt = B256::from(evm.stack.pop()?);

    let fork = evm.fork();
    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, memory_size)])?;
    let init_code_words =
        u64::try_from(memory_size).map_err(|_| VmError::OutOfGas)?.div_ceil(32);
    let init_code_gas =
        if fork.eip(3860) { gas::init_code_cost((init_code_words * 32) as usize) } else { 0 };
    evm.charge_gas(
        GAS_CREATE + GAS_KECCAK256_WORD * init_code_words + init_code_gas + extend.cost,
    )?;
    evm.memory.extend(extend.expand_by);

    let init_code = if memory_size.is_zero() {
        Bytes::new()
    } else {
        let start = usize::try_from(memory_start).expect("memory was extended");
        let size = usize::try_from(memory_size).expect("memory was extended");
        evm.memory.read(start, size)
    };
    let contract_address =
        compute_create2_contract_address(evm.message.current_target, salt, &init_code);
    if fork.eip(2929) {
        evm.message.accessed_addresses.insert(contract_address);
    }

    generic_create(evm, state, endowment, contract_address, memory_start, memory_size)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn return_(evm: &mut Evm<'_>) -> VmResult<()> {
    let memory_start = evm.stack.pop()?;
    let memory_size = evm.stack.pop()?;

    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, memory_size)])?;
    evm.charge_gas(GAS_ZERO + extend.cost)?;
    evm.memory.extend(extend.expand_by);

    evm.output = if memory_size.is_zero() {
        Bytes::new()
    } else {
        let start = usize::try_from(memory_start).expect("memory was extended");
        let size = usize::try_from(memory_size).expect("memory was extended");
        evm.memory.read(start, size)
    };
    evm.running = false;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn revert(evm: &mut Evm<'_>) -> VmResult<()> {
    let memory_start = evm.stack.pop()?;
    let memory_size = evm.stack.pop()?;

    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, memory_size)])?;
    evm.charge_gas(extend.cost)?;
    evm.memory.extend(extend.expand_by);

    evm.output = if memory_size.is_zero() {
        Bytes::new()
    } else {
        let start = usize::try_from(memory_start).expect("memory was extended");
        let size = usize::try_from(memory_size).expect("memory was extended");
        evm.memory.read(start, size)
    };
    Err(VmError::Revert)
}

pub(crate) fn selfdestruct(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let beneficiary = address_from_word(evm.stack.pop()?);
    let fork = evm.fork();
    let originator = evm.message.current_target;

    let mut gas_cost = gas::selfdestruct_cost(fork);
    if fork.eip(2929) && evm.message.accessed_addresses.insert(beneficiary) {
        gas_cost += gas::GAS_COLD_ACCOUNT_ACCESS;
    }

    let beneficiary_needs_creation = if fork.eip(161) {
        !state.is_account_alive(beneficiary)
            && !state.get_account(originator).balance.is_zero()
    } else {
        !state.account_exists(beneficiary)
    };
    if fork.eip(150) && beneficiary_needs_creation {
        gas_cost += GAS_SELF_DESTRUCT_NEW_ACCOUNT;
    }

    // One refund per originator across the whole frame chain; the
    // child's deletion set includes every ancestor's.
    if !fork.eip(3529) && !evm.accounts_to_delete.contains(&originator) {
        evm.refund_counter += REFUND_SELF_DESTRUCT as i64;
    }

    evm.charge_gas(gas_cost)?;
    if evm.message.is_static {
        return Err(VmError::WriteInStaticContext);
    }

    let originator_balance = state.get_account(originator).balance;
    state.add_balance(beneficiary, originator_balance);
    // Self-transfers burn: the balance is zeroed after the credit.
    state.set_balance(originator, U256::ZERO);

    if !fork.eip(6780) || state.account_created_in_transaction(originator) {
        evm.accounts_to_delete.insert(originator);
    }
    evm.touched_accounts.insert(beneficiary);

    evm.running = false;
    evm.pc += 1;
    Ok(())
}
