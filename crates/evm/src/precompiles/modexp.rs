//! The MODEXP precompile (EIP-198, repriced by EIP-2565).

use crate::{memory::buffer_read, Evm, VmError, VmResult};
use alloc::{vec, vec::Vec};
use alloy_primitives::U256;

/// The EIP-198 gas divisor.
const GAS_QUAD_DIVISOR: U256 = U256::from_limbs([20, 0, 0, 0]);

/// Arbitrary-precision `base^exp mod modulus` over length-prefixed
/// big-endian operands.
pub(crate) fn modexp(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();

    let base_length = U256::from_be_slice(&buffer_read(&data, U256::ZERO, U256::from(32)));
    let exp_length = U256::from_be_slice(&buffer_read(&data, U256::from(32), U256::from(32)));
    let modulus_length =
        U256::from_be_slice(&buffer_read(&data, U256::from(64), U256::from(32)));

    let exp_start = U256::from(96) + base_length;
    // Only the first 32 bytes of the exponent weigh into the gas.
    let exp_head = U256::from_be_slice(&buffer_read(
        &data,
        exp_start,
        exp_length.min(U256::from(32)),
    ));

    let gas = gas_cost(evm.fork(), base_length, modulus_length, exp_length, exp_head);
    evm.charge_gas(u64::try_from(gas).unwrap_or(u64::MAX))?;

    if base_length.is_zero() && modulus_length.is_zero() {
        evm.output = alloy_primitives::Bytes::new();
        return Ok(());
    }

    // The charge above makes oversized operands unaffordable long before
    // these conversions can fail.
    let base_length = usize::try_from(base_length).map_err(|_| VmError::OutOfGas)?;
    let exp_length = usize::try_from(exp_length).map_err(|_| VmError::OutOfGas)?;
    let modulus_length = usize::try_from(modulus_length).map_err(|_| VmError::OutOfGas)?;

    let base = buffer_read(&data, U256::from(96), U256::from(base_length));
    let exp = buffer_read(&data, exp_start, U256::from(exp_length));
    let modulus = buffer_read(
        &data,
        exp_start + U256::from(exp_length),
        U256::from(modulus_length),
    );

    let output = if modulus.iter().all(|byte| *byte == 0) {
        vec![0u8; modulus_length]
    } else {
        let result = aurora_engine_modexp::modexp(&base, &exp, &modulus);
        // Left-pad the result to the modulus width.
        let mut padded = vec![0u8; modulus_length - result.len().min(modulus_length)];
        padded.extend_from_slice(&result[result.len().saturating_sub(modulus_length)..]);
        padded
    };
    evm.output = output.into();
    Ok(())
}

/// The gas charge: the EIP-2565 formula from Berlin, the original
/// EIP-198 formula before it. Computed in 256-bit arithmetic so absurd
/// lengths saturate into an unaffordable charge rather than overflow.
fn gas_cost(
    fork: silex_forks::Fork,
    base_length: U256,
    modulus_length: U256,
    exp_length: U256,
    exp_head: U256,
) -> U256 {
    let max_length = base_length.max(modulus_length);

    let iteration_count = if exp_length <= U256::from(32) && exp_head.is_zero() {
        U256::ZERO
    } else if exp_length <= U256::from(32) {
        U256::from(exp_head.bit_len().saturating_sub(1))
    } else {
        U256::from(8) * (exp_length - U256::from(32))
            + U256::from(exp_head.bit_len().saturating_sub(1))
    };
    let iteration_count = iteration_count.max(U256::from(1));

    if fork.eip(2565) {
        let words = (max_length + U256::from(7)) / U256::from(8);
        let multiplication_complexity = words * words;
        (multiplication_complexity * iteration_count / U256::from(3)).max(U256::from(200))
    } else {
        let multiplication_complexity = eip198_complexity(max_length);
        multiplication_complexity * iteration_count / GAS_QUAD_DIVISOR
    }
}

/// The piecewise-quadratic complexity of EIP-198.
fn eip198_complexity(length: U256) -> U256 {
    if length <= U256::from(64) {
        length * length
    } else if length <= U256::from(1024) {
        length * length / U256::from(4) + U256::from(96) * length - U256::from(3072)
    } else {
        length * length / U256::from(16) + U256::from(480) * length - U256::from(199_680)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silex_forks::Fork;

    #[test]
    fn test_berlin_floor_is_200() {
        // 1-byte operands cost the EIP-2565 floor.
        assert_eq!(
            gas_cost(Fork::Berlin, U256::from(1), U256::from(1), U256::from(1), U256::from(3)),
            U256::from(200),
        );
    }

    #[test]
    fn test_byzantium_quadratic_complexity() {
        // 64-byte operands, one-bit exponent: 64² · 1 / 20.
        assert_eq!(
            gas_cost(Fork::Byzantium, U256::from(64), U256::from(64), U256::from(1), U256::from(1)),
            U256::from(64u64 * 64 / 20),
        );
    }
}
