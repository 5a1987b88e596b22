//! Memory instructions.

use crate::{
    gas::{self, GAS_BASE, GAS_COPY, GAS_VERY_LOW},
    Evm, VmError, VmResult,
};
use alloy_primitives::U256;

pub(crate) fn mload(evm: &mut Evm<'_>) -> VmResult<()> {
    let offset = evm.stack.pop()?;

    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(offset, U256::from(32))])?;
    evm.charge_gas(GAS_VERY_LOW + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    let offset = usize::try_from(offset).expect("memory was extended");
    evm.stack.push(U256::from_be_slice(&evm.memory.read(offset, 32)))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn mstore(evm: &mut Evm<'_>) -> VmResult<()> {
    let offset = evm.stack.pop()?;
    let value = evm.stack.pop()?;

    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(offset, U256::from(32))])?;
    evm.charge_gas(GAS_VERY_LOW + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    let offset = usize::try_from(offset).expect("memory was extended");
    evm.memory.write(offset, &value.to_be_bytes::<32>());
    evm.pc += 1;
    Ok(())
}

pub(crate) fn mstore8(evm: &mut Evm<'_>) -> VmResult<()> {
    let offset = evm.stack.pop()?;
    let value = evm.stack.pop()?;

    let extend =
        gas::calculate_gas_extend_memory(evm.memory.len(), &[(offset, U256::from(1))])?;
    evm.charge_gas(GAS_VERY_LOW + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    let offset = usize::try_from(offset).expect("memory was extended");
    evm.memory.write(offset, &[value.to_be_bytes::<32>()[31]]);
    evm.pc += 1;
    Ok(())
}

pub(crate) fn msize(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.memory.len()))?;
    evm.pc += 1;
    Ok(())
}

/// MCOPY (EIP-5656): overlapping-safe memory-to-memory copy.
pub(crate) fn mcopy(evm: &mut Evm<'_>) -> VmResult<()> {
    let destination = evm.stack.pop()?;
    let source = evm.stack.pop()?;
    let size = evm.stack.pop()?;

    let words = u64::try_from(size).map_err(|_| VmError::OutOfGas)?.div_ceil(32);
    let extend = gas::calculate_gas_extend_memory(
        evm.memory.len(),
        &[(source, size), (destination, size)],
    )?;
    evm.charge_gas(GAS_VERY_LOW + GAS_COPY * words + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    if !size.is_zero() {
        let source = usize::try_from(source).expect("memory was extended");
        let destination = usize::try_from(destination).expect("memory was extended");
        let size = usize::try_from(size).expect("memory was extended");
        let value = evm.memory.read(source, size);
        evm.memory.write(destination, &value);
    }
    evm.pc += 1;
    Ok(())
}
