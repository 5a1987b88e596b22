//! Control flow, stack manipulation, and the PUSH family.

use crate::{
    gas::{GAS_BASE, GAS_HIGH, GAS_JUMPDEST, GAS_MID, GAS_VERY_LOW},
    memory::buffer_read,
    Evm, VmError, VmResult,
};
use alloy_primitives::U256;

pub(crate) fn stop(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.running = false;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn pop(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.stack.pop()?;
    evm.charge_gas(GAS_BASE)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn jump(evm: &mut Evm<'_>) -> VmResult<()> {
    let destination = evm.stack.pop()?;
    evm.charge_gas(GAS_MID)?;
    evm.pc = validated_destination(evm, destination)?;
    Ok(())
}

pub(crate) fn jumpi(evm: &mut Evm<'_>) -> VmResult<()> {
    let destination = evm.stack.pop()?;
    let condition = evm.stack.pop()?;
    evm.charge_gas(GAS_HIGH)?;

    if condition.is_zero() {
        evm.pc += 1;
    } else {
        evm.pc = validated_destination(evm, destination)?;
    }
    Ok(())
}

fn validated_destination(evm: &Evm<'_>, destination: U256) -> VmResult<usize> {
    let destination =
        usize::try_from(destination).map_err(|_| VmError::InvalidJumpDestination)?;
    if !evm.valid_jump_destinations.contains(&destination) {
        return Err(VmError::InvalidJumpDestination);
    }
    Ok(destination)
}

pub(crate) fn pc(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.pc))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn gas_left(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.gas_left))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn jumpdest(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_JUMPDEST)?;
    evm.pc += 1;
    Ok(())
}

/// PUSH0 through PUSH32. The immediate is read from code with zero fill
/// past the end.
pub(crate) fn push(evm: &mut Evm<'_>, num_bytes: u8) -> VmResult<()> {
    evm.charge_gas(if num_bytes == 0 { GAS_BASE } else { GAS_VERY_LOW })?;

    let immediate = buffer_read(
        &evm.message.code,
        U256::from(evm.pc + 1),
        U256::from(num_bytes),
    );
    evm.stack.push(U256::from_be_slice(&immediate))?;
    evm.pc += 1 + num_bytes as usize;
    Ok(())
}

pub(crate) fn dup(evm: &mut Evm<'_>, item_number: u8) -> VmResult<()> {
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.dup(item_number as usize - 1)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn swap(evm: &mut Evm<'_>, item_number: u8) -> VmResult<()> {
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.swap(item_number as usize)?;
    evm.pc += 1;
    Ok(())
}
