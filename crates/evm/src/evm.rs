//! This module contains the [Evm] frame state and its child-merging
//! rules.

use crate::{
    env::{BlockEnv, TxEnv},
    gas::{GAS_COLD_ACCOUNT_ACCESS, GAS_WARM_ACCESS},
    Memory, Message, Stack, VmError, VmResult,
};
use alloc::{collections::BTreeSet, vec::Vec};
use alloy_primitives::{Address, Bytes, B256};
use silex_primitives::Log;
use silex_state::State;

/// The RIPEMD-160 precompile address, party to the 2016 state-clearing
/// incident: a failed child call to it still marks it touched.
const RIPEMD160_ADDRESS: Address = Address::with_last_byte(0x03);

/// The state of one executing message frame.
///
/// A frame owns its [Message] (including the warm sets cloned from its
/// parent) and the per-frame accumulators. Parents absorb the
/// accumulators of successful children via
/// [Self::incorporate_child_on_success]; failed children surrender only
/// their remaining gas.
#[derive(Debug)]
pub struct Evm<'env> {
    /// The block-scoped environment.
    pub block: &'env BlockEnv,
    /// The transaction-scoped environment.
    pub tx: &'env TxEnv,
    /// The frame inputs.
    pub message: Message,
    /// The operand stack.
    pub stack: Stack,
    /// The frame memory.
    pub memory: Memory,
    /// The program counter.
    pub pc: usize,
    /// Gas remaining.
    pub gas_left: u64,
    /// Byte offsets of every JUMPDEST outside push data.
    pub valid_jump_destinations: BTreeSet<usize>,
    /// Output of the most recent child call.
    pub return_data: Bytes,
    /// This frame's RETURN/REVERT payload.
    pub output: Bytes,
    /// SSTORE refund accumulator; reversals can drive it negative
    /// transiently.
    pub refund_counter: i64,
    /// Cleared by the halting instructions.
    pub running: bool,
    /// Logs emitted by this frame and its successful children.
    pub logs: Vec<Log>,
    /// Accounts queued for end-of-transaction destruction.
    pub accounts_to_delete: BTreeSet<Address>,
    /// Accounts touched by this frame, for the EIP-161 sweep.
    pub touched_accounts: BTreeSet<Address>,
    /// The condition that halted the frame, if any.
    pub error: Option<VmError>,
}

impl<'env> Evm<'env> {
    /// Creates a frame over the given message, analyzing its code for
    /// jump destinations.
    pub fn new(block: &'env BlockEnv, tx: &'env TxEnv, mut message: Message) -> Self {
        let valid_jump_destinations = valid_jump_destinations(&message.code);
        let accounts_to_delete = core::mem::take(&mut message.accounts_to_delete);
        Self {
            block,
            tx,
            gas_left: message.gas,
            message,
            stack: Stack::new(),
            memory: Memory::new(),
            pc: 0,
            valid_jump_destinations,
            return_data: Bytes::new(),
            output: Bytes::new(),
            refund_counter: 0,
            running: true,
            logs: Vec::new(),
            accounts_to_delete,
            touched_accounts: BTreeSet::new(),
            error: None,
        }
    }

    /// The fork governing this frame.
    pub fn fork(&self) -> silex_forks::Fork {
        self.block.fork
    }

    /// Deducts gas from the frame, raising [VmError::OutOfGas] with no
    /// partial charge when the balance is insufficient.
    pub fn charge_gas(&mut self, amount: u64) -> VmResult<()> {
        if self.gas_left < amount {
            return Err(VmError::OutOfGas);
        }
        self.gas_left -= amount;
        Ok(())
    }

    /// Warms an address and returns the EIP-2929 access charge. Only
    /// meaningful from Berlin onward; callers gate on the fork.
    pub fn access_account(&mut self, address: Address) -> u64 {
        if self.message.accessed_addresses.insert(address) {
            GAS_COLD_ACCOUNT_ACCESS
        } else {
            GAS_WARM_ACCESS
        }
    }

    /// Warms a storage key and returns the EIP-2929 access charge
    /// component for SLOAD/SSTORE.
    pub fn access_storage_key(&mut self, address: Address, key: B256) -> bool {
        self.message.accessed_storage_keys.insert((address, key))
    }

    /// Absorbs a successful child frame: gas, refunds, logs, deletion
    /// and touch sets, and warm sets all propagate.
    pub fn incorporate_child_on_success(&mut self, child: Evm<'_>, state: &State) {
        self.gas_left += child.gas_left;
        self.refund_counter += child.refund_counter;
        self.logs.extend(child.logs);
        self.accounts_to_delete.extend(child.accounts_to_delete);
        self.touched_accounts.extend(child.touched_accounts);
        if state.account_exists_and_is_empty(child.message.current_target) {
            self.touched_accounts.insert(child.message.current_target);
        }
        self.message.accessed_addresses.extend(child.message.accessed_addresses);
        self.message.accessed_storage_keys.extend(child.message.accessed_storage_keys);
    }

    /// Absorbs a failed child frame: only the remaining gas returns,
    /// with one carve-out for the RIPEMD-160 touched-account incident.
    pub fn incorporate_child_on_error(&mut self, child: Evm<'_>, state: &State) {
        if child.message.current_target == RIPEMD160_ADDRESS
            && state.account_exists_and_is_empty(RIPEMD160_ADDRESS)
        {
            self.touched_accounts.insert(RIPEMD160_ADDRESS);
        }
        self.gas_left += child.gas_left;
    }
}

/// Scans bytecode for the JUMPDEST offsets that are not inside PUSH
/// immediates.
fn valid_jump_destinations(code: &[u8]) -> BTreeSet<usize> {
    const JUMPDEST: u8 = 0x5b;
    const PUSH1: u8 = 0x60;
    const PUSH32: u8 = 0x7f;

    let mut destinations = BTreeSet::new();
    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        if op == JUMPDEST {
            destinations.insert(pc);
        } else if (PUSH1..=PUSH32).contains(&op) {
            pc += (op - PUSH1) as usize + 1;
        }
        pc += 1;
    }
    destinations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jumpdest_analysis_skips_push_data() {
        // PUSH2 0x5b5b, JUMPDEST, PUSH1 0x5b, JUMPDEST
        let code = [0x61, 0x5b, 0x5b, 0x5b, 0x60, 0x5b, 0x5b];
        let destinations = valid_jump_destinations(&code);
        assert_eq!(destinations, BTreeSet::from([3, 6]));
    }

    #[test]
    fn test_truncated_push_terminates_analysis() {
        // PUSH32 with only 2 trailing bytes.
        let code = [0x7f, 0x5b, 0x5b];
        assert!(valid_jump_destinations(&code).is_empty());
    }
}
