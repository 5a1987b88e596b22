//! The KECCAK256 instruction.

use crate::{
    gas::{self, GAS_KECCAK256, GAS_KECCAK256_WORD},
    Evm, VmResult,
};
use alloy_primitives::U256;

pub(crate) fn keccak256(evm: &mut Evm<'_>) -> VmResult<()> {
    let offset = evm.stack.pop()?;
    let size = evm.stack.pop()?;

    let extend = gas::calculate_gas_extend_memory(evm.memory.len(), &[(offset, size)])?;
    let words = u64::try_from(size).map_err(|_| crate::VmError::OutOfGas)?.div_ceil(32);
    evm.charge_gas(GAS_KECCAK256 + GAS_KECCAK256_WORD * words + extend.cost)?;

    evm.memory.extend(extend.expand_by);
    let data = if size.is_zero() {
        alloy_primitives::Bytes::new()
    } else {
        let offset = usize::try_from(offset).expect("memory was extended");
        let size = usize::try_from(size).expect("memory was extended");
        evm.memory.read(offset, size)
    };
    evm.stack.push(U256::from_be_bytes(alloy_primitives::keccak256(&data).0))?;
    evm.pc += 1;
    Ok(())
}
