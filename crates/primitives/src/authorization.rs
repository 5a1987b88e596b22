//! EIP-7702 authorizations and code-delegation designations.

use crate::signature::{recover_address, SignatureError, SECP256K1N};
use alloc::vec::Vec;
use alloy_primitives::{keccak256, Address, U256};
use alloy_rlp::{Encodable, RlpDecodable, RlpEncodable};

/// The magic byte prefixed to an authorization's signing payload.
const SET_CODE_TX_MAGIC: u8 = 0x05;

/// The marker prefix of a code-delegation designation (`0xef0100`).
pub const EOA_DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// A single EIP-7702 authorization: a signed commitment by an EOA to run
/// the code of `address` in its place.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct Authorization {
    /// Chain this authorization is valid on; zero means every chain.
    pub chain_id: U256,
    /// The address whose code the authority delegates to.
    pub address: Address,
    /// The authority's nonce at the time the delegation applies.
    pub nonce: u64,
    /// Signature parity bit.
    pub y_parity: u8,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// Recovers the authority (signer) of an EIP-7702 authorization.
///
/// The signature bounds are stricter than transaction signatures: the
/// parity must be a single bit and `s` must be in the low half of the
/// curve order.
pub fn recover_authority(authorization: &Authorization) -> Result<Address, SignatureError> {
    if authorization.y_parity > 1 {
        return Err(SignatureError::InvalidYParity);
    }
    if authorization.r.is_zero() || authorization.r >= SECP256K1N {
        return Err(SignatureError::InvalidR);
    }
    if authorization.s.is_zero() || authorization.s > SECP256K1N.wrapping_div(U256::from(2)) {
        return Err(SignatureError::InvalidS);
    }

    let mut payload = Vec::new();
    authorization.chain_id.encode(&mut payload);
    authorization.address.encode(&mut payload);
    authorization.nonce.encode(&mut payload);

    let mut preimage = Vec::with_capacity(payload.len() + 10);
    preimage.push(SET_CODE_TX_MAGIC);
    alloy_rlp::Header { list: true, payload_length: payload.len() }.encode(&mut preimage);
    preimage.extend_from_slice(&payload);

    recover_address(
        keccak256(preimage),
        authorization.r,
        authorization.s,
        authorization.y_parity,
    )
}

/// Returns `true` if the given account code is a 23-byte EIP-7702
/// delegation designation.
pub fn is_delegation_designation(code: &[u8]) -> bool {
    code.len() == EOA_DELEGATION_PREFIX.len() + Address::len_bytes()
        && code.starts_with(&EOA_DELEGATION_PREFIX)
}

/// Extracts the delegation target from account code, if the code is a
/// delegation designation.
pub fn delegation_target(code: &[u8]) -> Option<Address> {
    is_delegation_designation(code)
        .then(|| Address::from_slice(&code[EOA_DELEGATION_PREFIX.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_delegation_designation_shape() {
        let target = address!("1234567890123456789012345678901234567890");
        let mut code = EOA_DELEGATION_PREFIX.to_vec();
        code.extend_from_slice(target.as_slice());
        assert!(is_delegation_designation(&code));
        assert_eq!(delegation_target(&code), Some(target));

        assert!(!is_delegation_designation(&code[..22]));
        assert!(!is_delegation_designation(&[0xef, 0x01, 0x01, 0x00]));
        assert_eq!(delegation_target(b"\x60\x00\x60\x00"), None);
    }

    #[test]
    fn test_authority_signature_bounds() {
        let authorization = Authorization {
            y_parity: 2,
            r: U256::from(1),
            s: U256::from(1),
            ..Default::default()
        };
        assert_eq!(recover_authority(&authorization), Err(SignatureError::InvalidYParity));

        let authorization = Authorization {
            y_parity: 0,
            r: U256::ZERO,
            s: U256::from(1),
            ..Default::default()
        };
        assert_eq!(recover_authority(&authorization), Err(SignatureError::InvalidR));

        let authorization = Authorization {
            y_parity: 0,
            r: U256::from(1),
            // Above the low-s bound.
            s: SECP256K1N - U256::from(1),
            ..Default::default()
        };
        assert_eq!(recover_authority(&authorization), Err(SignatureError::InvalidS));
    }
}
