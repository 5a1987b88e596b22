//! The LOG0 through LOG4 instructions.

use crate::{
    gas::{self, GAS_LOG, GAS_LOG_DATA, GAS_LOG_TOPIC},
    Evm, VmError, VmResult,
};
use alloy_primitives::{Log, LogData, B256};

pub(crate) fn log_n(evm: &mut Evm<'_>, num_topics: u8) -> VmResult<()> {
    let memory_start = evm.stack.pop()?;
    let size = evm.stack.pop()?;
    let mut topics = alloc::vec::Vec::with_capacity(num_topics as usize);
    for _ in 0..num_topics {
        topics.push(B256::from(evm.stack.pop()?));
    }

    let extend = gas::calculate_gas_extend_memory(evm.memory.len(), &[(memory_start, size)])?;
    let data_cost = GAS_LOG_DATA
        .checked_mul(u64::try_from(size).map_err(|_| VmError::OutOfGas)?)
        .ok_or(VmError::OutOfGas)?;
    evm.charge_gas(
        GAS_LOG + data_cost + GAS_LOG_TOPIC * num_topics as u64 + extend.cost,
    )?;
    if evm.message.is_static {
        return Err(VmError::WriteInStaticContext);
    }

    evm.memory.extend(extend.expand_by);
    let data = if size.is_zero() {
        alloy_primitives::Bytes::new()
    } else {
        let memory_start = usize::try_from(memory_start).expect("memory was extended");
        let size = usize::try_from(size).expect("memory was extended");
        evm.memory.read(memory_start, size)
    };

    evm.logs.push(Log {
        address: evm.message.current_target,
        data: LogData::new_unchecked(topics, data),
    });
    evm.pc += 1;
    Ok(())
}
