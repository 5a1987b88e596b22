//! The KZG point-evaluation precompile (EIP-4844).

use crate::{gas::GAS_POINT_EVALUATION, Evm, VmError, VmResult};
use alloc::vec::Vec;
use alloy_primitives::{B256, U256};
use sha2::{Digest as _, Sha256};
use silex_primitives::VERSIONED_HASH_VERSION_KZG;

/// Field elements committed to by one blob.
const FIELD_ELEMENTS_PER_BLOB: u64 = 4096;

/// The BLS12-381 scalar field modulus, part of the fixed output.
const BLS_MODULUS: [u8; 32] = [
    0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09, 0xa1, 0xd8,
    0x05, 0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00,
    0x00, 0x01,
];

/// Converts a KZG commitment to its versioned hash: sha256 with the
/// first byte replaced by the version tag.
pub fn kzg_to_versioned_hash(commitment: &[u8]) -> B256 {
    let mut hash: [u8; 32] = Sha256::digest(commitment).into();
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    B256::from(hash)
}

/// Verifies a KZG opening proof: the polynomial committed to by
/// `commitment` (whose versioned hash must match) evaluates to `y` at
/// `z`.
pub(crate) fn point_evaluation(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_POINT_EVALUATION)?;

    if data.len() != 192 {
        return Err(VmError::KzgProofError);
    }
    let versioned_hash = &data[..32];
    let z = &data[32..64];
    let y = &data[64..96];
    let commitment = &data[96..144];
    let proof = &data[144..192];

    if kzg_to_versioned_hash(commitment).as_slice() != versioned_hash {
        return Err(VmError::KzgProofError);
    }

    let commitment =
        c_kzg::Bytes48::from_bytes(commitment).map_err(|_| VmError::KzgProofError)?;
    let proof = c_kzg::Bytes48::from_bytes(proof).map_err(|_| VmError::KzgProofError)?;
    let z = c_kzg::Bytes32::from_bytes(z).map_err(|_| VmError::KzgProofError)?;
    let y = c_kzg::Bytes32::from_bytes(y).map_err(|_| VmError::KzgProofError)?;

    let settings = c_kzg::ethereum_kzg_settings(0);
    let valid = settings
        .verify_kzg_proof(&commitment, &z, &y, &proof)
        .map_err(|_| VmError::KzgProofError)?;
    if !valid {
        return Err(VmError::KzgProofError);
    }

    let mut output = Vec::with_capacity(64);
    output.extend_from_slice(&U256::from(FIELD_ELEMENTS_PER_BLOB).to_be_bytes::<32>());
    output.extend_from_slice(&BLS_MODULUS);
    evm.output = output.into();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_hash_tags_version_byte() {
        let hash = kzg_to_versioned_hash(&[0u8; 48]);
        assert_eq!(hash[0], VERSIONED_HASH_VERSION_KZG);
        let plain: [u8; 32] = Sha256::digest([0u8; 48]).into();
        assert_eq!(&hash[1..], &plain[1..]);
    }
}
