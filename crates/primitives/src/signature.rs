//! Transaction signing hashes and sender recovery.

use crate::{Transaction, TxType};
use alloc::vec::Vec;
use alloy_primitives::{keccak256, uint, Address, B256, U256};
use alloy_rlp::Encodable;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use silex_forks::Fork;

/// The order of the secp256k1 curve.
pub const SECP256K1N: U256 =
    uint!(0xfffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141_U256);

/// An error produced while validating or recovering a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The legacy `v` value matches neither the pre-155 nor the chain's
    /// EIP-155 form.
    #[error("invalid signature v value")]
    InvalidV,
    /// The parity bit of a typed signature is not 0 or 1.
    #[error("invalid signature parity bit")]
    InvalidYParity,
    /// `r` is zero or not below the curve order.
    #[error("signature r out of range")]
    InvalidR,
    /// `s` is zero or outside the permitted range.
    #[error("signature s out of range")]
    InvalidS,
    /// The signature does not resolve to a public key.
    #[error("unrecoverable signature")]
    Recovery,
}

/// Computes the hash a transaction's signature commits to.
///
/// Legacy transactions hash a bare field list, with the chain id folded
/// in per EIP-155 when `v` indicates replay protection. Typed
/// transactions hash their type byte followed by the unsigned field
/// tuple.
pub fn signing_hash(tx: &Transaction, chain_id: u64) -> Result<B256, SignatureError> {
    match tx {
        Transaction::Legacy(tx) => {
            let mut payload = Vec::new();
            tx.nonce.encode(&mut payload);
            tx.gas_price.encode(&mut payload);
            tx.gas.encode(&mut payload);
            tx.to.encode(&mut payload);
            tx.value.encode(&mut payload);
            tx.data.encode(&mut payload);
            if tx.v >= U256::from(35) {
                chain_id.encode(&mut payload);
                0u8.encode(&mut payload);
                0u8.encode(&mut payload);
            }
            Ok(keccak256(wrap_list(&payload)))
        }
        Transaction::AccessList(tx) => {
            let mut payload = Vec::new();
            tx.chain_id.encode(&mut payload);
            tx.nonce.encode(&mut payload);
            tx.gas_price.encode(&mut payload);
            tx.gas.encode(&mut payload);
            tx.to.encode(&mut payload);
            tx.value.encode(&mut payload);
            tx.data.encode(&mut payload);
            tx.access_list.encode(&mut payload);
            Ok(typed_signing_hash(TxType::AccessList, &payload))
        }
        Transaction::FeeMarket(tx) => {
            let mut payload = Vec::new();
            tx.chain_id.encode(&mut payload);
            tx.nonce.encode(&mut payload);
            tx.max_priority_fee_per_gas.encode(&mut payload);
            tx.max_fee_per_gas.encode(&mut payload);
            tx.gas.encode(&mut payload);
            tx.to.encode(&mut payload);
            tx.value.encode(&mut payload);
            tx.data.encode(&mut payload);
            tx.access_list.encode(&mut payload);
            Ok(typed_signing_hash(TxType::FeeMarket, &payload))
        }
        Transaction::Blob(tx) => {
            let mut payload = Vec::new();
            tx.chain_id.encode(&mut payload);
            tx.nonce.encode(&mut payload);
            tx.max_priority_fee_per_gas.encode(&mut payload);
            tx.max_fee_per_gas.encode(&mut payload);
            tx.gas.encode(&mut payload);
            tx.to.encode(&mut payload);
            tx.value.encode(&mut payload);
            tx.data.encode(&mut payload);
            tx.access_list.encode(&mut payload);
            tx.max_fee_per_blob_gas.encode(&mut payload);
            tx.blob_versioned_hashes.encode(&mut payload);
            Ok(typed_signing_hash(TxType::Blob, &payload))
        }
        Transaction::SetCode(tx) => {
            let mut payload = Vec::new();
            tx.chain_id.encode(&mut payload);
            tx.nonce.encode(&mut payload);
            tx.max_priority_fee_per_gas.encode(&mut payload);
            tx.max_fee_per_gas.encode(&mut payload);
            tx.gas.encode(&mut payload);
            tx.to.encode(&mut payload);
            tx.value.encode(&mut payload);
            tx.data.encode(&mut payload);
            tx.access_list.encode(&mut payload);
            tx.authorizations.encode(&mut payload);
            Ok(typed_signing_hash(TxType::SetCode, &payload))
        }
    }
}

/// Recovers the sender address of a signed transaction.
///
/// ## Takes
/// - `fork`: the active fork, which decides whether high-`s` signatures
///   are rejected (EIP-2).
/// - `chain_id`: the chain the transaction must be replay-protected for.
/// - `tx`: the signed transaction.
///
/// ## Returns
/// The 20-byte sender address, or the reason the signature is invalid.
pub fn recover_sender(
    fork: Fork,
    chain_id: u64,
    tx: &Transaction,
) -> Result<Address, SignatureError> {
    let (r, s, recovery_bit) = match tx {
        Transaction::Legacy(tx) => {
            let v = tx.v;
            let recovery_bit = if v == U256::from(27) || v == U256::from(28) {
                (v == U256::from(28)) as u8
            } else {
                // EIP-155: v = 35 + chain_id * 2 + parity.
                let base = U256::from(35) + U256::from(chain_id) * U256::from(2);
                if v != base && v != base + U256::from(1) {
                    return Err(SignatureError::InvalidV);
                }
                (v == base + U256::from(1)) as u8
            };
            (tx.r, tx.s, recovery_bit)
        }
        Transaction::AccessList(tx) => (tx.r, tx.s, parity_bit(tx.y_parity)?),
        Transaction::FeeMarket(tx) => (tx.r, tx.s, parity_bit(tx.y_parity)?),
        Transaction::Blob(tx) => (tx.r, tx.s, parity_bit(tx.y_parity)?),
        Transaction::SetCode(tx) => (tx.r, tx.s, parity_bit(tx.y_parity)?),
    };

    if r.is_zero() || r >= SECP256K1N {
        return Err(SignatureError::InvalidR);
    }
    if s.is_zero() || s >= SECP256K1N {
        return Err(SignatureError::InvalidS);
    }
    if fork.eip(2) && s > SECP256K1N.wrapping_div(U256::from(2)) {
        return Err(SignatureError::InvalidS);
    }

    recover_address(signing_hash(tx, chain_id)?, r, s, recovery_bit)
}

/// Recovers the address behind a prehashed message and a recoverable
/// signature: the last 20 bytes of the keccak of the uncompressed public
/// key.
pub fn recover_address(
    hash: B256,
    r: U256,
    s: U256,
    recovery_bit: u8,
) -> Result<Address, SignatureError> {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r.to_be_bytes::<32>());
    compact[32..].copy_from_slice(&s.to_be_bytes::<32>());

    let signature =
        EcdsaSignature::from_slice(&compact).map_err(|_| SignatureError::Recovery)?;
    let recovery_id =
        RecoveryId::from_byte(recovery_bit).ok_or(SignatureError::Recovery)?;
    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)
        .map_err(|_| SignatureError::Recovery)?;

    let uncompressed = key.to_encoded_point(false);
    Ok(Address::from_slice(&keccak256(&uncompressed.as_bytes()[1..])[12..]))
}

/// Hash of `type_byte ∥ rlp([...unsigned fields...])`.
fn typed_signing_hash(tx_type: TxType, payload: &[u8]) -> B256 {
    let mut preimage = Vec::with_capacity(payload.len() + 10);
    preimage.push(tx_type.byte());
    alloy_rlp::Header { list: true, payload_length: payload.len() }.encode(&mut preimage);
    preimage.extend_from_slice(payload);
    keccak256(preimage)
}

fn parity_bit(y_parity: u8) -> Result<u8, SignatureError> {
    if y_parity > 1 {
        return Err(SignatureError::InvalidYParity);
    }
    Ok(y_parity)
}

fn wrap_list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    alloy_rlp::Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeeMarketTx, LegacyTx};
    use alloy_primitives::{Bytes, TxKind};
    use k256::ecdsa::SigningKey;

    pub(crate) fn test_key() -> SigningKey {
        SigningKey::from_slice(&[0x01; 32]).unwrap()
    }

    pub(crate) fn key_address(key: &SigningKey) -> Address {
        let uncompressed = key.verifying_key().to_encoded_point(false);
        Address::from_slice(&keccak256(&uncompressed.as_bytes()[1..])[12..])
    }

    fn sign_prehash(key: &SigningKey, hash: B256) -> (U256, U256, u8) {
        let (mut signature, mut recovery_id) =
            key.sign_prehash_recoverable(hash.as_slice()).unwrap();
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id = RecoveryId::from_byte(recovery_id.to_byte() ^ 1).unwrap();
        }
        (
            U256::from_be_slice(&signature.r().to_bytes()),
            U256::from_be_slice(&signature.s().to_bytes()),
            recovery_id.to_byte(),
        )
    }

    fn unsigned_legacy() -> LegacyTx {
        LegacyTx {
            nonce: 0,
            gas_price: 10_000_000_000,
            gas: 21_000,
            to: TxKind::Call(Address::with_last_byte(0xbb)),
            value: U256::from(1_000_000u64),
            data: Bytes::new(),
            v: U256::ZERO,
            r: U256::ZERO,
            s: U256::ZERO,
        }
    }

    #[test]
    fn test_recover_legacy_eip155() {
        let key = test_key();
        let chain_id = 1u64;

        let mut inner = unsigned_legacy();
        // Mark the tx as replay-protected before hashing.
        inner.v = U256::from(37);
        let hash = signing_hash(&Transaction::Legacy(inner.clone()), chain_id).unwrap();
        let (r, s, bit) = sign_prehash(&key, hash);
        inner.v = U256::from(35 + chain_id * 2 + bit as u64);
        inner.r = r;
        inner.s = s;

        let recovered =
            recover_sender(Fork::London, chain_id, &Transaction::Legacy(inner)).unwrap();
        assert_eq!(recovered, key_address(&key));
    }

    #[test]
    fn test_recover_legacy_pre155() {
        let key = test_key();
        let mut inner = unsigned_legacy();
        let hash = signing_hash(&Transaction::Legacy(inner.clone()), 1).unwrap();
        let (r, s, bit) = sign_prehash(&key, hash);
        inner.v = U256::from(27 + bit as u64);
        inner.r = r;
        inner.s = s;

        let recovered = recover_sender(Fork::Frontier, 1, &Transaction::Legacy(inner)).unwrap();
        assert_eq!(recovered, key_address(&key));
    }

    #[test]
    fn test_recover_typed() {
        let key = test_key();
        let mut inner = FeeMarketTx {
            chain_id: 1,
            nonce: 3,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 20,
            gas: 50_000,
            to: TxKind::Call(Address::with_last_byte(0xcc)),
            value: U256::ZERO,
            data: Bytes::from_static(b"\x00\x01"),
            ..Default::default()
        };
        let hash = signing_hash(&Transaction::FeeMarket(inner.clone()), 1).unwrap();
        let (r, s, bit) = sign_prehash(&key, hash);
        inner.y_parity = bit;
        inner.r = r;
        inner.s = s;

        let recovered =
            recover_sender(Fork::Cancun, 1, &Transaction::FeeMarket(inner)).unwrap();
        assert_eq!(recovered, key_address(&key));
    }

    #[test]
    fn test_wrong_chain_id_v_rejected() {
        let mut inner = unsigned_legacy();
        inner.v = U256::from(35 + 5 * 2); // chain id 5
        inner.r = U256::from(1);
        inner.s = U256::from(1);
        assert_eq!(
            recover_sender(Fork::London, 1, &Transaction::Legacy(inner)),
            Err(SignatureError::InvalidV),
        );
    }

    #[test]
    fn test_high_s_rejected_from_homestead() {
        let key = test_key();
        let mut inner = unsigned_legacy();
        let hash = signing_hash(&Transaction::Legacy(inner.clone()), 1).unwrap();
        let (r, s, bit) = sign_prehash(&key, hash);
        // Flip to the high-s twin of the signature.
        inner.v = U256::from(27 + (bit ^ 1) as u64);
        inner.r = r;
        inner.s = SECP256K1N - s;

        assert!(recover_sender(Fork::Frontier, 1, &Transaction::Legacy(inner.clone())).is_ok());
        assert_eq!(
            recover_sender(Fork::Homestead, 1, &Transaction::Legacy(inner)),
            Err(SignatureError::InvalidS),
        );
    }
}
