//! The ECRECOVER precompile.

use crate::{gas::GAS_ECRECOVER, memory::buffer_read, Evm, VmResult};
use alloc::vec::Vec;
use alloy_primitives::{B256, U256};
use silex_primitives::{recover_address, SECP256K1N};

/// Recovers the signer of a prehashed message.
///
/// Malformed signatures are not an error: the precompile succeeds with
/// empty output and the gas stays spent.
pub(crate) fn ecrecover(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_ECRECOVER)?;

    let message_hash = B256::from_slice(&buffer_read(&data, U256::ZERO, U256::from(32)));
    let v = U256::from_be_slice(&buffer_read(&data, U256::from(32), U256::from(32)));
    let r = U256::from_be_slice(&buffer_read(&data, U256::from(64), U256::from(32)));
    let s = U256::from_be_slice(&buffer_read(&data, U256::from(96), U256::from(32)));

    if v != U256::from(27) && v != U256::from(28) {
        return Ok(());
    }
    if r.is_zero() || r >= SECP256K1N || s.is_zero() || s >= SECP256K1N {
        return Ok(());
    }

    let recovery_bit = (v == U256::from(28)) as u8;
    let Ok(address) = recover_address(message_hash, r, s, recovery_bit) else {
        return Ok(());
    };

    let mut output = Vec::with_capacity(32);
    output.extend_from_slice(&[0u8; 12]);
    output.extend_from_slice(address.as_slice());
    evm.output = output.into();
    Ok(())
}
