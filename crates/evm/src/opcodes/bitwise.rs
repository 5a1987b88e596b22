//! Comparison and bitwise instructions.

use crate::{
    gas::{GAS_LOW, GAS_VERY_LOW},
    Evm, VmResult,
};
use alloy_primitives::U256;

fn bool_word(value: bool) -> U256 {
    if value {
        U256::from(1)
    } else {
        U256::ZERO
    }
}

/// Two's-complement comparison key: flipping the sign bit orders signed
/// values like unsigned ones.
fn signed_key(value: U256) -> U256 {
    value ^ (U256::from(1) << 255)
}

pub(crate) fn lt(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(bool_word(x < y))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn gt(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(bool_word(x > y))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn slt(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(bool_word(signed_key(x) < signed_key(y)))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn sgt(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(bool_word(signed_key(x) > signed_key(y)))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn eq(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(bool_word(x == y))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn is_zero(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(bool_word(x.is_zero()))?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn and(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(x & y)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn or(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(x | y)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn xor(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    let y = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(x ^ y)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn not(evm: &mut Evm<'_>) -> VmResult<()> {
    let x = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;
    evm.stack.push(!x)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn byte(evm: &mut Evm<'_>) -> VmResult<()> {
    let index = evm.stack.pop()?;
    let word = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;

    let result = if index >= U256::from(32) {
        U256::ZERO
    } else {
        let index = usize::try_from(index).expect("bounded above");
        U256::from(word.to_be_bytes::<32>()[index])
    };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn shl(evm: &mut Evm<'_>) -> VmResult<()> {
    let shift = evm.stack.pop()?;
    let value = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;

    let result = if shift >= U256::from(256) {
        U256::ZERO
    } else {
        value << usize::try_from(shift).expect("bounded above")
    };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn shr(evm: &mut Evm<'_>) -> VmResult<()> {
    let shift = evm.stack.pop()?;
    let value = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;

    let result = if shift >= U256::from(256) {
        U256::ZERO
    } else {
        value >> usize::try_from(shift).expect("bounded above")
    };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn sar(evm: &mut Evm<'_>) -> VmResult<()> {
    let shift = evm.stack.pop()?;
    let value = evm.stack.pop()?;
    evm.charge_gas(GAS_VERY_LOW)?;

    let negative = value.bit(255);
    let result = if shift >= U256::from(256) {
        if negative {
            U256::MAX
        } else {
            U256::ZERO
        }
    } else {
        let shift = usize::try_from(shift).expect("bounded above");
        let mut shifted = value >> shift;
        if negative && shift > 0 {
            // Fill the vacated high bits with the sign.
            shifted |= U256::MAX << (256 - shift);
        }
        shifted
    };
    evm.stack.push(result)?;
    evm.pc += 1;
    Ok(())
}

pub(crate) fn clz(evm: &mut Evm<'_>) -> VmResult<()> {
    let value = evm.stack.pop()?;
    evm.charge_gas(GAS_LOW)?;
    evm.stack.push(U256::from(value.leading_zeros()))?;
    evm.pc += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_key_orders_two_complement() {
        let minus_one = U256::MAX;
        let one = U256::from(1);
        assert!(signed_key(minus_one) < signed_key(U256::ZERO));
        assert!(signed_key(U256::ZERO) < signed_key(one));
    }
}
