//! The precompiled contracts at addresses 0x01 through 0x11.
//!
//! Each precompile is a flat function over the frame: it charges its own
//! gas against `evm.gas_left`, reads `evm.message.data`, and writes
//! `evm.output`. Errors abort the frame like any other exceptional halt.

use crate::{Evm, VmResult};
use alloc::vec::Vec;
use alloy_primitives::Address;
use silex_forks::Fork;

mod ecrecover;
mod hash;
mod modexp;
mod bn128;
mod blake2f;
mod kzg;
mod bls12;

/// ECRECOVER.
pub const ECRECOVER_ADDRESS: Address = Address::with_last_byte(0x01);
/// SHA2-256.
pub const SHA256_ADDRESS: Address = Address::with_last_byte(0x02);
/// RIPEMD-160.
pub const RIPEMD160_ADDRESS: Address = Address::with_last_byte(0x03);
/// The identity function.
pub const IDENTITY_ADDRESS: Address = Address::with_last_byte(0x04);
/// Arbitrary-precision modular exponentiation (EIP-198).
pub const MODEXP_ADDRESS: Address = Address::with_last_byte(0x05);
/// BN128 point addition (EIP-196).
pub const BN128_ADD_ADDRESS: Address = Address::with_last_byte(0x06);
/// BN128 scalar multiplication (EIP-196).
pub const BN128_MUL_ADDRESS: Address = Address::with_last_byte(0x07);
/// BN128 pairing check (EIP-197).
pub const BN128_PAIRING_ADDRESS: Address = Address::with_last_byte(0x08);
/// BLAKE2b compression (EIP-152).
pub const BLAKE2F_ADDRESS: Address = Address::with_last_byte(0x09);
/// KZG point evaluation (EIP-4844).
pub const POINT_EVALUATION_ADDRESS: Address = Address::with_last_byte(0x0a);
/// BLS12-381 G1 addition (EIP-2537).
pub const BLS12_G1_ADD_ADDRESS: Address = Address::with_last_byte(0x0b);
/// BLS12-381 G1 multi-scalar multiplication (EIP-2537).
pub const BLS12_G1_MSM_ADDRESS: Address = Address::with_last_byte(0x0c);
/// BLS12-381 G2 addition (EIP-2537).
pub const BLS12_G2_ADD_ADDRESS: Address = Address::with_last_byte(0x0d);
/// BLS12-381 G2 multi-scalar multiplication (EIP-2537).
pub const BLS12_G2_MSM_ADDRESS: Address = Address::with_last_byte(0x0e);
/// BLS12-381 pairing check (EIP-2537).
pub const BLS12_PAIRING_ADDRESS: Address = Address::with_last_byte(0x0f);
/// BLS12-381 map-Fp-to-G1 (EIP-2537).
pub const BLS12_MAP_FP_TO_G1_ADDRESS: Address = Address::with_last_byte(0x10);
/// BLS12-381 map-Fp2-to-G2 (EIP-2537).
pub const BLS12_MAP_FP2_TO_G2_ADDRESS: Address = Address::with_last_byte(0x11);

/// The precompile addresses live at the given fork, used both for
/// dispatch and for warm-set seeding.
pub fn addresses(fork: Fork) -> Vec<Address> {
    let mut out = alloc::vec![
        ECRECOVER_ADDRESS,
        SHA256_ADDRESS,
        RIPEMD160_ADDRESS,
        IDENTITY_ADDRESS,
    ];
    if fork.eip(198) {
        out.push(MODEXP_ADDRESS);
    }
    if fork.eip(196) {
        out.push(BN128_ADD_ADDRESS);
        out.push(BN128_MUL_ADDRESS);
    }
    if fork.eip(197) {
        out.push(BN128_PAIRING_ADDRESS);
    }
    if fork.eip(152) {
        out.push(BLAKE2F_ADDRESS);
    }
    if fork.eip(4844) {
        out.push(POINT_EVALUATION_ADDRESS);
    }
    if fork.eip(2537) {
        out.extend([
            BLS12_G1_ADD_ADDRESS,
            BLS12_G1_MSM_ADDRESS,
            BLS12_G2_ADD_ADDRESS,
            BLS12_G2_MSM_ADDRESS,
            BLS12_PAIRING_ADDRESS,
            BLS12_MAP_FP_TO_G1_ADDRESS,
            BLS12_MAP_FP2_TO_G2_ADDRESS,
        ]);
    }
    out
}

/// Returns `true` if the address hosts a precompile at the given fork.
pub fn is_precompile(address: Address, fork: Fork) -> bool {
    addresses(fork).contains(&address)
}

/// Runs the precompile at `address` against the frame.
pub(crate) fn dispatch(evm: &mut Evm<'_>, address: Address) -> VmResult<()> {
    match address {
        ECRECOVER_ADDRESS => ecrecover::ecrecover(evm),
        SHA256_ADDRESS => hash::sha256(evm),
        RIPEMD160_ADDRESS => hash::ripemd160(evm),
        IDENTITY_ADDRESS => hash::identity(evm),
        MODEXP_ADDRESS => modexp::modexp(evm),
        BN128_ADD_ADDRESS => bn128::add(evm),
        BN128_MUL_ADDRESS => bn128::mul(evm),
        BN128_PAIRING_ADDRESS => bn128::pairing_check(evm),
        BLAKE2F_ADDRESS => blake2f::compress(evm),
        POINT_EVALUATION_ADDRESS => kzg::point_evaluation(evm),
        BLS12_G1_ADD_ADDRESS => bls12::g1_add(evm),
        BLS12_G1_MSM_ADDRESS => bls12::g1_msm(evm),
        BLS12_G2_ADD_ADDRESS => bls12::g2_add(evm),
        BLS12_G2_MSM_ADDRESS => bls12::g2_msm(evm),
        BLS12_PAIRING_ADDRESS => bls12::pairing_check(evm),
        BLS12_MAP_FP_TO_G1_ADDRESS => bls12::map_fp_to_g1(evm),
        BLS12_MAP_FP2_TO_G2_ADDRESS => bls12::map_fp2_to_g2(evm),
        _ => unreachable!("dispatch is guarded by is_precompile"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precompile_set_grows_with_forks() {
        assert_eq!(addresses(Fork::Frontier).len(), 4);
        assert_eq!(addresses(Fork::Byzantium).len(), 8);
        assert_eq!(addresses(Fork::Istanbul).len(), 9);
        assert_eq!(addresses(Fork::Cancun).len(), 10);
        assert_eq!(addresses(Fork::Prague).len(), 17);
    }

    #[test]
    fn test_is_precompile_is_fork_sensitive() {
        assert!(is_precompile(POINT_EVALUATION_ADDRESS, Fork::Cancun));
        assert!(!is_precompile(POINT_EVALUATION_ADDRESS, Fork::Shanghai));
        assert!(!is_precompile(Address::with_last_byte(0x12), Fork::Osaka));
    }
}
