//! Persistent and transient storage instructions, including the
//! fork-tiered SSTORE gas and refund schedule.

use crate::{
    gas::{
        self, GAS_CALL_STIPEND, GAS_COLD_SLOAD, GAS_STORAGE_CLEAR_REFUND,
        GAS_STORAGE_CLEAR_REFUND_PRE_LONDON, GAS_STORAGE_SET, GAS_STORAGE_UPDATE,
        GAS_WARM_ACCESS,
    },
    Evm, VmError, VmResult,
};
use alloy_primitives::{B256, U256};
use silex_state::State;

pub(crate) fn sload(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let key = B256::from(evm.stack.pop()?);
    let address = evm.message.current_target;

    let cost = if evm.fork().eip(2929) {
        if evm.access_storage_key(address, key) {
            GAS_COLD_SLOAD
        } else {
            GAS_WARM_ACCESS
        }
    } else {
        gas::sload_cost(evm.fork())
    };
    evm.charge_gas(cost)?;

    evm.stack.push(state.get_storage(address, key))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn sstore(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let key = B256::from(evm.stack.pop()?);
    let new_value = evm.stack.pop()?;
    let fork = evm.fork();

    // EIP-2200: leave headroom for the call stipend.
    if fork.eip(2200) && evm.gas_left <= GAS_CALL_STIPEND {
        return Err(VmError::OutOfGas);
    }

    let address = evm.message.current_target;
    let original_value = state.get_storage_original(address, key);
    let current_value = state.get_storage(address, key);

    let gas_cost = if fork.eip(2200) {
        sstore_gas_eip2200(evm, address, key, original_value, current_value, new_value)
    } else {
        legacy_sstore_gas(current_value, new_value)
    };
    evm.refund_counter +=
        sstore_refund(fork, original_value, current_value, new_value);

    evm.charge_gas(gas_cost)?;
    if evm.message.is_static {
        return Err(VmError::WriteInStaticContext);
    }
    state.set_storage(address, key, new_value);
    evm.pc += 1;
    Ok(())
}

/// The net-metered schedule of EIP-2200, with EIP-2929's warm/cold
/// split layered on from Berlin.
fn sstore_gas_eip2200(
    evm: &mut Evm<'_>,
    address: alloy_primitives::Address,
    key: B256,
    original_value: U256,
    current_value: U256,
    new_value: U256,
) -> u64 {
    let fork = evm.fork();
    let mut gas_cost = 0;

    if fork.eip(2929) && evm.access_storage_key(address, key) {
        gas_cost += GAS_COLD_SLOAD;
    }

    if original_value == current_value && current_value != new_value {
        if original_value.is_zero() {
            gas_cost += GAS_STORAGE_SET;
        } else if fork.eip(2929) {
            gas_cost += GAS_STORAGE_UPDATE - GAS_COLD_SLOAD;
        } else {
            gas_cost += GAS_STORAGE_UPDATE;
        }
    } else {
        gas_cost += dirty_write_cost(fork);
    }
    gas_cost
}

/// The pre-Istanbul schedule: pay for the write, no access tiers.
fn legacy_sstore_gas(current_value: U256, new_value: U256) -> u64 {
    if current_value.is_zero() && !new_value.is_zero() {
        GAS_STORAGE_SET
    } else {
        GAS_STORAGE_UPDATE
    }
}

/// The cost of a write to a slot already written this transaction.
fn dirty_write_cost(fork: silex_forks::Fork) -> u64 {
    if fork.eip(2929) {
        GAS_WARM_ACCESS
    } else {
        // EIP-2200 charges the SLOAD price for dirty writes.
        gas::sload_cost(fork)
    }
}

/// Refund bookkeeping for one SSTORE. Reversals subtract, so the
/// running counter is signed.
fn sstore_refund(
    fork: silex_forks::Fork,
    original_value: U256,
    current_value: U256,
    new_value: U256,
) -> i64 {
    let clear_refund = if fork.eip(3529) {
        GAS_STORAGE_CLEAR_REFUND as i64
    } else {
        GAS_STORAGE_CLEAR_REFUND_PRE_LONDON as i64
    };

    if !fork.eip(2200) {
        // Legacy rule: clearing a non-zero slot refunds, nothing else
        // does.
        if !current_value.is_zero() && new_value.is_zero() {
            return clear_refund;
        }
        return 0;
    }

    let mut refund = 0i64;
    if current_value != new_value {
        if !original_value.is_zero() && !current_value.is_zero() && new_value.is_zero() {
            refund += clear_refund;
        }
        if !original_value.is_zero() && current_value.is_zero() {
            // The slot was cleared earlier in this transaction and is
            // now being re-set; take the earlier refund back.
            refund -= clear_refund;
        }
        if original_value == new_value {
            // Restoring the transaction-entry value refunds the
            // difference against the cheap dirty write.
            let dirty = dirty_write_cost(fork) as i64;
            if original_value.is_zero() {
                refund += GAS_STORAGE_SET as i64 - dirty;
            } else if fork.eip(2929) {
                refund +=
                    (GAS_STORAGE_UPDATE - GAS_COLD_SLOAD) as i64 - dirty;
            } else {
                refund += GAS_STORAGE_UPDATE as i64 - dirty;
            }
        }
    }
    refund
}

pub(crate) fn tload(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let key = B256::from(evm.stack.pop()?);
    evm.charge_gas(GAS_WARM_ACCESS)?;
    evm.stack.push(state.get_transient_storage(evm.message.current_target, key))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn tstore(evm: &mut Evm<'_>, state: &mut State) -> VmResult<()> {
    let key = B256::from(evm.stack.pop()?);
    let value = evm.stack.pop()?;
    evm.charge_gas(GAS_WARM_ACCESS)?;
    if evm.message.is_static {
        return Err(VmError::WriteInStaticContext);
    }
    state.set_transient_storage(evm.message.current_target, key, value);
    evm.pc += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use silex_forks::Fork;

    #[test]
    fn test_refund_reversal_nets_to_zero() {
        // Slot originally 3: clear it, then set it to 5. The clear
        // refund must be taken back.
        let original = U256::from(3);
        let cleared = sstore_refund(Fork::Berlin, original, original, U256::ZERO);
        let reset = sstore_refund(Fork::Berlin, original, U256::ZERO, U256::from(5));
        assert_eq!(cleared + reset, 0);
    }

    #[test]
    fn test_restore_original_refunds_difference() {
        // Slot originally 3, currently 7, restored to 3 (Berlin).
        let refund =
            sstore_refund(Fork::Berlin, U256::from(3), U256::from(7), U256::from(3));
        assert_eq!(refund, (GAS_STORAGE_UPDATE - GAS_COLD_SLOAD - GAS_WARM_ACCESS) as i64);
    }

    #[test]
    fn test_clear_refund_halved_by_london() {
        let berlin =
            sstore_refund(Fork::Berlin, U256::from(1), U256::from(1), U256::ZERO);
        let london =
            sstore_refund(Fork::London, U256::from(1), U256::from(1), U256::ZERO);
        assert_eq!(berlin, GAS_STORAGE_CLEAR_REFUND_PRE_LONDON as i64);
        assert_eq!(london, GAS_STORAGE_CLEAR_REFUND as i64);
    }

    #[test]
    fn test_legacy_refund_only_on_clear() {
        assert_eq!(
            sstore_refund(Fork::Frontier, U256::ZERO, U256::from(2), U256::ZERO),
            GAS_STORAGE_CLEAR_REFUND_PRE_LONDON as i64,
        );
        assert_eq!(sstore_refund(Fork::Frontier, U256::ZERO, U256::from(2), U256::from(3)), 0);
    }
}
