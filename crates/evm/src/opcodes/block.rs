//! Instructions reading the block environment.

use crate::{
    gas::{self, GAS_BASE, GAS_BLOCK_HASH},
    Evm, VmResult,
};
use alloy_primitives::U256;

pub(crate) fn blockhash(evm: &mut Evm<'_>) -> VmResult<()> {
    let requested = evm.stack.pop()?;
    evm.charge_gas(GAS_BLOCK_HASH)?;

    let current = U256::from(evm.block.number);
    let hashes = &evm.block.block_hashes;
    let hash = if requested >= current {
        U256::ZERO
    } else {
        let depth = current - requested;
        if depth > U256::from(256) || depth > U256::from(hashes.len()) {
            U256::ZERO
        } else {
            let depth = usize::try_from(depth).expect("bounded above");
            U256::from_be_bytes(hashes[hashes.len() - depth].0)
        }
    };
    evm.stack.push(hash)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn coinbase(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from_be_slice(evm.block.coinbase.as_slice()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn timestamp(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.block.timestamp))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn number(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.block.number))?;
    evm.pc += 1;
    Ok(())
}

/// DIFFICULTY before the Merge, PREVRANDAO (EIP-4399) after.
pub(crate) fn prev_randao(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    let word = if evm.fork().eip(4399) {
        U256::from_be_bytes(evm.block.prev_randao.0)
    } else {
        evm.block.difficulty
    };
    evm.stack.push(word)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn gas_limit(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.block.gas_limit))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn chain_id(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.block.chain_id))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn base_fee(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    evm.stack.push(U256::from(evm.block.base_fee_per_gas.unwrap_or_default()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn blob_base_fee(evm: &mut Evm<'_>) -> VmResult<()> {
    evm.charge_gas(GAS_BASE)?;
    let price = gas::calculate_blob_gas_price(
        evm.fork(),
        evm.block.excess_blob_gas.unwrap_or_default(),
    );
    evm.stack.push(price)?;
    evm.pc += 1;
    Ok(())
}
