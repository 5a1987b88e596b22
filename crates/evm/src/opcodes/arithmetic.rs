//! Arithmetic instructions, all modulo 2^256.

use crate::{
    gas::{self, GAS_EXPONENTIATION, GAS_LOW, GAS_MID, GAS_VERY_LOW},
    Evm, VmResult,
};
use alloy_primitives::U256;

/// The most negative two's-complement 256-bit value, `-2^255`.
const MIN_SIGNED: U256 = U256::from_limbs([0, 0, 0, 0x8000_0000_0000_0000]);

/// Interprets a word as two's complement and returns `(negative,
/// magnitude)`.
fn to_sign_magnitude(value: U256) -> (bool, U256) {
    if value.bit(255) {
        (true, (!value).wrapping_add(U256::from(1)))
    } else {
        (false, value)
    }
}

/// Rebuilds a two's-complement word from a sign and magnitude.
fn from_sign_magnitude(negative: bool, magnitude: U256) -> U256 {
    if negative {
        (!magnitude).wrapping_add(U256::from(1))
    } else {
        magnitude
    }
}

pub(crate) fn add(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(x.wrapping_add(y))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn mul(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;
    evm.stack.push(x.wrapping_mul(y))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn sub(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(x.wrapping_sub(y))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn div(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;
    let quotient = if y.is_zero() { U256::ZERO } else { x / y };
    evm.stack.push(quotient)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn sdiv(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;

    let quotient = if y.is_zero() {
        U256::ZERO
    } else if x == MIN_SIGNED && y == U256::MAX {
        // -2^255 / -1 overflows back to -2^255.
        MIN_SIGNED
    } else {
        let (x_neg, x_mag) = to_sign_magnitude(x);
        let (y_neg, y_mag) = to_sign_magnitude(y);
        from_sign_magnitude(x_neg != y_neg, x_mag / y_mag)
    };
    evm.stack.push(quotient)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn rem(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;
    let remainder = if y.is_zero() { U256::ZERO } else { x % y };
    evm.stack.push(remainder)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn srem(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;

    let remainder = if y.is_zero() {
        U256::ZERO
    } else {
        // The result takes the dividend's sign.
        let (x_neg, x_mag) = to_sign_magnitude(x);
        let (_, y_mag) = to_sign_magnitude(y);
        from_sign_magnitude(x_neg, x_mag % y_mag)
    };
    evm.stack.push(remainder)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn addmod(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    let modulus = evm.stack.pop()?;
    evm.charge_gas(GAS_MID)?;
    let result = if modulus.is_zero() { U256::ZERO } else { x.add_mod(y, modulus) };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn mulmod(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    let modulus = evm.stack.pop()?;
    evm.charge_gas(GAS_MID)?;
    let result = if modulus.is_zero() { U256::ZERO } else { x.mul_mod(y, modulus) };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn exp(evm: &mut Evm<'_>) -> VmResult<()> {
    let base = evm.stack.pop()?;
    let exponent = evm.stack.pop()?;

    let exponent_bytes = (exponent.bit_len() as u64).div_ceil(8);
    evm.charge_gas(GAS_EXPONENTIATION + gas::exp_byte_cost(evm.fork()) * exponent_bytes)?;

    evm.stack.push(wrapping_pow(base, exponent))?;
    evm.pc += 1;
    Ok(())
}

/// Square-and-multiply modulo 2^256.
fn wrapping_pow(base: U256, exponent: U256) -> U256 {
    let mut result = U256::from(1);
    let mut square = base;
    for i in 0..exponent.bit_len() {
        if exponent.bit(i) {
            result = result.wrapping_mul(square);
        }
        square = square.wrapping_mul(square);
    }
    result
}

pub(crate) fn signextend(evm: &mut Evm<'_>) -> VmResult<()> {
    let byte_num = evm.stack.pop()?;
    let value = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;

    let result = if byte_num >= U256::from(32) {
        value
    } else {
        let byte_num = usize::try_from(byte_num).expect("bounded above");
        let sign_bit = byte_num * 8 + 7;
        let low_mask = U256::MAX >> (255 - sign_bit);
        if value.bit(sign_bit) {
            value | !low_mask
        } else {
            value & low_mask
        }
    };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude_round_trip() {
        let minus_two = U256::MAX - U256::from(1);
        let (neg, mag) = to_sign_magnitude(minus_two);
        assert!(neg);
        assert_eq!(mag, U256::from(2));
        assert_eq!(from_sign_magnitude(neg, mag), minus_two);
    }

    #[test]
    fn test_wrapping_pow() {
        assert_eq!(wrapping_pow(U256::from(2), U256::from(10)), U256::from(1024));
        assert_eq!(wrapping_pow(U256::from(3), U256::ZERO), U256::from(1));
        // 2^256 wraps to zero.
        assert_eq!(wrapping_pow(U256::from(2), U256::from(256)), U256::ZERO);
    }
}
