//! Instructions reading the execution environment: accounts, calldata,
//! code, and return data.

use crate::{
    gas::{self, GAS_BASE, GAS_COPY, GAS_FAST_STEP, GAS_VERY_LOW},
    memory::buffer_read,
    Evm, VmError, VmResult,
};
use alloy_primitives::{keccak256, Address, B256, U256};
use silex_state::State;

fn word_from_address(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

fn address_from_word(word: U256) -> Address {
    Address::from_slice(&word.to_be_bytes::<32>()[12..])
}

pub(crate) fn address(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(word_from_address(evm.message.current_target))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn balance(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let target = address_from_word(evm.stack.pop()?);

    let access_cost = if evm.fork().eip(2929) {
        evm.access_account(target)
    } else {
        gas::balance_cost(evm.fork())
    };
    evm.charge_gas(access_cost)?;

    evm.stack.push(state.get_account(target).balance)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn origin(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(word_from_address(evm.tx.origin))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn caller(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(word_from_address(evm.message.caller))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn callvalue(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(evm.message.value)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn calldataload(evm: &mut Evm<'_>) -> VmResult<()> {
    let offset = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;

    let word = buffer_read(&evm.message.data, offset, U256::from(32));
    evm.stack.push(U256::from_be_slice(&word))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn calldatasize(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.message.data.len()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn calldatacopy(evm: &mut Evm<'_>) -> VmResult<()> {
    let memory_start = evm.stack.pop()?;
    let data_start = evm.stack.pop()?;
    let size = evm.stack.pop()?;

    let extend = gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, size)])?;
    let words = u64::try_from(size).map_err(|_| VmError::OutOfGas)?.div_ceil(32);
    evm.charge_gas(GAS_VERY_LOW + GAS_COPY * words + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    if !size.is_zero() {
        let value = buffer_read(&evm.message.data, data_start, size);
        evm.memory.write(usize::try_from(memory_start).expect("memory was extended"), &value);
    }
    evm.pc += 1;
    Ok(())
}

pub(crate) fn codesize(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.message.code.len()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn codecopy(evm: &mut Evm<'_>) -> VmResult<()> {
    let memory_start = evm.stack.pop()?;
    let code_start = evm.stack.pop()?;
    let size = evm.stack.pop()?;

    let extend = gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, size)])?;
    let words = u64::try_from(size).map_err(|_| VmError::OutOfGas)?.div_ceil(32);
    evm.charge_gas(GAS_VERY_LOW + GAS_COPY * words + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    if !size.is_zero() {
        let value = buffer_read(&evm.message.code, code_start, size);
        evm.memory.write(usize::try_from(memory_start).expect("memory was extended"), &value);
    }
    evm.pc += 1;
    Ok(())
}

pub(crate) fn gasprice(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.tx.gas_price))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn extcodesize(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let target = address_from_word(evm.stack.pop()?);

    let access_cost = if evm.fork().eip(2929) {
        evm.access_account(target)
    } else {
        gas::extcode_base_cost(evm.fork())
    };
    evm.charge_gas(access_cost)?;

    evm.stack.push(U256::from(state.get_code(target).len()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn extcodecopy(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let target = address_from_word(evm.stack.pop()?);
    let memory_start = evm.stack.pop()?;
    let code_start = evm.stack.pop()?;
    let size = evm.stack.pop()?;

    let extend = gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, size)])?;
    let words = u64::try_from(size).map_err(|_| VmError::OutOfGas)?.div_ceil(32);
    let access_cost = if evm.fork().eip(2929) {
        evm.access_account(target)
    } else {
        gas::extcode_base_cost(evm.fork())
    };
    evm.charge_gas(access_cost + GAS_COPY * words + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    if !size.is_zero() {
        let value = buffer_read(&state.get_code(target), code_start, size);
        evm.memory.write(usize::try_from(memory_start).expect("memory was extended"), &value);
    }
    evm.pc += 1;
    Ok(())
}

pub(crate) fn returndatasize(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.return_data.len()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn returndatacopy(evm: &mut Evm<'_>) -> VmResult<()> {
    let memory_start = evm.stack.pop()?;
    let data_start = evm.stack.pop()?;
    let size = evm.stack.pop()?;

    let extend = gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, size)])?;
    let words = u64::try_from(size).map_err(|_| VmError::OutOfGas)?.div_ceil(32);
    evm.charge_gas(GAS_VERY_LOW + GAS_COPY * words + extend.cost)?;

    // Unlike the other copies, reading past the end of return data is an
    // error rather than zero fill.
    let end = data_start.checked_add(size).ok_or(VmError::OutOfBoundsRead)?;
    if end > U256::from(evm.return_data.len()) {
        return Err(VmError::OutOfBoundsRead);
    }

    evm.memory.extend(extend.expand_by);
    if !size.is_zero() {
        let data_start = usize::try_from(data_start).expect("bounds were checked");
        let size = usize::try_from(size).expect("bounds were checked");
        let value = evm.return_data.slice(data_start..data_start + size);
        evm.memory.write(usize::try_from(memory_start).expect("memory was extended"), &value);
    }
    evm.pc += 1;
    Ok(())
}

pub(crate) fn extcodehash(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let target = address_from_word(evm.stack.pop()?);

    let access_cost = if evm.fork().eip(2929) {
        evm.access_account(target)
    } else {
        gas::extcodehash_cost(evm.fork())
    };
    evm.charge_gas(access_cost)?;

    // Empty (or absent) accounts hash to zero; codeless but alive
    // accounts hash their empty code.
    let account = state.get_account(target);
    let hash = if account.is_empty() {
        U256::ZERO
    } else {
        U256::from_be_bytes(keccak256(&account.code).0)
    };
    evm.stack.push(hash)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn self_balance(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    evm.charge_gas(GAS_FAST_STEP)?;
    evm.stack.push(state.get_account(evm.message.current_target).balance)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn blob_hash(evm: &mut Evm<'_>) -> VmResult<()> {
    let index = evm.stack.pop()?;
    evm.charge_gas(gas::GAS_BLOBHASH_OPCODE)?;

    let hash = usize::try_from(index)
        .ok()
        .and_then(|index| evm.tx.blob_versioned_hashes.get(index).copied())
        .unwrap_or(B256::ZERO);
    evm.stack.push(U256::from_be_bytes(hash.0))?;
    evm.pc += 1;
    Ok(())
}
