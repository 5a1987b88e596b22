//! The BN128 precompiles (EIP-196/197, repriced by EIP-1108).

use crate::{memory::buffer_read, Evm, VmError, VmResult};
use alloc::{vec, vec::Vec};
use alloy_primitives::U256;
use bn::{AffineG1, AffineG2, Fq, Fq2, Fr, Group, Gt, G1, G2};

/// Parses a G1 point from two 32-byte coordinates; `(0, 0)` is the
/// group identity. Invalid points burn the call's gas.
fn read_g1(x_bytes: &[u8], y_bytes: &[u8]) -> VmResult<G1> {
    let x = Fq::from_slice(x_bytes).map_err(|_| VmError::OutOfGas)?;
    let y = Fq::from_slice(y_bytes).map_err(|_| VmError::OutOfGas)?;
    if x == Fq::zero() && y == Fq::zero() {
        return Ok(G1::zero());
    }
    AffineG1::new(x, y).map(Into::into).map_err(|_| VmError::OutOfGas)
}

/// Writes a G1 point as two 32-byte coordinates; the identity encodes
/// as 64 zero bytes.
fn write_g1(point: G1) -> Vec<u8> {
    let mut output = vec![0u8; 64];
    if let Some(affine) = AffineG1::from_jacobian(point) {
        affine.x().to_big_endian(&mut output[..32]).expect("buffer is 32 bytes");
        affine.y().to_big_endian(&mut output[32..]).expect("buffer is 32 bytes");
    }
    output
}

pub(crate) fn add(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(evm.fork().eip_select(1108, 150, 500))?;

    let input = buffer_read(&data, U256::ZERO, U256::from(128));
    let first = read_g1(&input[..32], &input[32..64])?;
    let second = read_g1(&input[64..96], &input[96..128])?;

    evm.output = write_g1(first + second).into();
    Ok(())
}

pub(crate) fn mul(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(evm.fork().eip_select(1108, 6_000, 40_000))?;

    let input = buffer_read(&data, U256::ZERO, U256::from(96));
    let point = read_g1(&input[..32], &input[32..64])?;
    // The scalar is any 256-bit integer, reduced modulo the group order.
    let scalar = Fr::new_mul_factor(
        bn::arith::U256::from_slice(&input[64..96]).map_err(|_| VmError::OutOfGas)?,
    );

    evm.output = write_g1(point * scalar).into();
    Ok(())
}

pub(crate) fn pairing_check(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    if data.len() % 192 != 0 {
        return Err(VmError::OutOfGas);
    }
    let pair_count = (data.len() / 192) as u64;
    let (per_pair, base) = evm.fork().eip_select(1108, (34_000, 45_000), (80_000, 100_000));
    evm.charge_gas(per_pair * pair_count + base)?;

    let mut pairs = Vec::with_capacity(pair_count as usize);
    for chunk in data.chunks_exact(192) {
        let g1 = read_g1(&chunk[..32], &chunk[32..64])?;
        // G2 coordinates arrive with the imaginary component first.
        let x_imaginary = Fq::from_slice(&chunk[64..96]).map_err(|_| VmError::OutOfGas)?;
        let x_real = Fq::from_slice(&chunk[96..128]).map_err(|_| VmError::OutOfGas)?;
        let y_imaginary = Fq::from_slice(&chunk[128..160]).map_err(|_| VmError::OutOfGas)?;
        let y_real = Fq::from_slice(&chunk[160..192]).map_err(|_| VmError::OutOfGas)?;

        let x = Fq2::new(x_real, x_imaginary);
        let y = Fq2::new(y_real, y_imaginary);
        let g2 = if x == Fq2::zero() && y == Fq2::zero() {
            G2::zero()
        } else {
            AffineG2::new(x, y).map(Into::into).map_err(|_| VmError::OutOfGas)?
        };
        pairs.push((g1, g2));
    }

    let ok = bn::pairing_batch(&pairs) == Gt::one();
    let mut output = vec![0u8; 32];
    output[31] = ok as u8;
    evm.output = output.into();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_round_trip() {
        let zero = read_g1(&[0u8; 32], &[0u8; 32]).unwrap();
        assert_eq!(write_g1(zero), vec![0u8; 64]);
    }

    #[test]
    fn test_generator_plus_identity() {
        // The generator (1, 2) is unchanged by adding the identity.
        let mut gen_bytes = [0u8; 64];
        gen_bytes[31] = 1;
        gen_bytes[63] = 2;
        let generator = read_g1(&gen_bytes[..32], &gen_bytes[32..]).unwrap();
        let sum = generator + G1::zero();
        assert_eq!(write_g1(sum), gen_bytes.to_vec());
    }

    #[test]
    fn test_point_off_curve_rejected() {
        let mut bad = [0u8; 64];
        bad[31] = 1;
        bad[63] = 3;
        assert_eq!(read_g1(&bad[..32], &bad[32..]).unwrap_err(), VmError::OutOfGas);
    }
}
