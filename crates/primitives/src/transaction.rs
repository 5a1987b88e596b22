//! This module contains the five transaction shapes and the typed
//! [Transaction] envelope with its EIP-2718 codec.

use crate::Authorization;
use alloc::{vec, vec::Vec};
use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};

/// The version byte of a KZG-backed blob versioned hash.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// The EIP-2718 transaction type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxType {
    /// An untyped pre-2718 transaction.
    Legacy,
    /// EIP-2930 access-list transaction.
    AccessList,
    /// EIP-1559 fee-market transaction.
    FeeMarket,
    /// EIP-4844 blob transaction.
    Blob,
    /// EIP-7702 set-code transaction.
    SetCode,
}

impl TxType {
    /// Returns the type byte prefixed to the transaction's RLP body.
    /// Legacy transactions carry no prefix; their nominal type is zero.
    pub const fn byte(self) -> u8 {
        match self {
            Self::Legacy => 0x00,
            Self::AccessList => 0x01,
            Self::FeeMarket => 0x02,
            Self::Blob => 0x03,
            Self::SetCode => 0x04,
        }
    }
}

/// One entry of an EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct AccessListEntry {
    /// The address warmed by this entry.
    pub address: Address,
    /// The storage slots of `address` warmed by this entry.
    pub storage_keys: Vec<B256>,
}

/// An untyped transaction, the only shape that predates EIP-2718.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct LegacyTx {
    /// Sender nonce.
    pub nonce: u64,
    /// Wei paid per unit of gas.
    pub gas_price: u128,
    /// Gas limit.
    pub gas: u64,
    /// Recipient, or create.
    pub to: TxKind,
    /// Wei transferred to the recipient.
    pub value: U256,
    /// Call data or init code.
    pub data: Bytes,
    /// Recovery id, optionally folded with the chain id (EIP-155).
    pub v: U256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// An EIP-2930 transaction: legacy pricing plus an access list.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct AccessListTx {
    /// Chain id, signed over directly rather than folded into `v`.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Wei paid per unit of gas.
    pub gas_price: u128,
    /// Gas limit.
    pub gas: u64,
    /// Recipient, or create.
    pub to: TxKind,
    /// Wei transferred to the recipient.
    pub value: U256,
    /// Call data or init code.
    pub data: Bytes,
    /// Addresses and slots warmed before execution.
    pub access_list: Vec<AccessListEntry>,
    /// Signature parity bit.
    pub y_parity: u8,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// An EIP-1559 fee-market transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct FeeMarketTx {
    /// Chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Maximum priority fee per gas, paid to the coinbase.
    pub max_priority_fee_per_gas: u128,
    /// Maximum total fee per gas the sender will pay.
    pub max_fee_per_gas: u128,
    /// Gas limit.
    pub gas: u64,
    /// Recipient, or create.
    pub to: TxKind,
    /// Wei transferred to the recipient.
    pub value: U256,
    /// Call data or init code.
    pub data: Bytes,
    /// Addresses and slots warmed before execution.
    pub access_list: Vec<AccessListEntry>,
    /// Signature parity bit.
    pub y_parity: u8,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// An EIP-4844 blob transaction. Always a call, never a create.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct BlobTx {
    /// Chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Maximum priority fee per gas.
    pub max_priority_fee_per_gas: u128,
    /// Maximum total fee per gas.
    pub max_fee_per_gas: u128,
    /// Gas limit.
    pub gas: u64,
    /// Recipient. Blob transactions must carry one.
    pub to: Address,
    /// Wei transferred to the recipient.
    pub value: U256,
    /// Call data.
    pub data: Bytes,
    /// Addresses and slots warmed before execution.
    pub access_list: Vec<AccessListEntry>,
    /// Maximum fee per unit of blob gas.
    pub max_fee_per_blob_gas: u128,
    /// Versioned hashes of the carried blobs.
    pub blob_versioned_hashes: Vec<B256>,
    /// Signature parity bit.
    pub y_parity: u8,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// An EIP-7702 set-code transaction. Always a call, never a create.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct SetCodeTx {
    /// Chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Maximum priority fee per gas.
    pub max_priority_fee_per_gas: u128,
    /// Maximum total fee per gas.
    pub max_fee_per_gas: u128,
    /// Gas limit.
    pub gas: u64,
    /// Recipient. Set-code transactions must carry one.
    pub to: Address,
    /// Wei transferred to the recipient.
    pub value: U256,
    /// Call data.
    pub data: Bytes,
    /// Addresses and slots warmed before execution.
    pub access_list: Vec<AccessListEntry>,
    /// Code delegations to install on the authorizing accounts.
    pub authorizations: Vec<Authorization>,
    /// Signature parity bit.
    pub y_parity: u8,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
}

/// A transaction of any of the five protocol shapes.
///
/// The discriminant matches the EIP-2718 type byte; see [TxType].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// An untyped pre-2718 transaction.
    Legacy(LegacyTx),
    /// EIP-2930.
    AccessList(AccessListTx),
    /// EIP-1559.
    FeeMarket(FeeMarketTx),
    /// EIP-4844.
    Blob(BlobTx),
    /// EIP-7702.
    SetCode(SetCodeTx),
}

impl Default for Transaction {
    fn default() -> Self {
        Self::Legacy(LegacyTx::default())
    }
}

impl Transaction {
    /// Returns the transaction's type tag.
    pub const fn tx_type(&self) -> TxType {
        match self {
            Self::Legacy(_) => TxType::Legacy,
            Self::AccessList(_) => TxType::AccessList,
            Self::FeeMarket(_) => TxType::FeeMarket,
            Self::Blob(_) => TxType::Blob,
            Self::SetCode(_) => TxType::SetCode,
        }
    }

    /// Sender nonce.
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.nonce,
            Self::AccessList(tx) => tx.nonce,
            Self::FeeMarket(tx) => tx.nonce,
            Self::Blob(tx) => tx.nonce,
            Self::SetCode(tx) => tx.nonce,
        }
    }

    /// Gas limit.
    pub const fn gas(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.gas,
            Self::AccessList(tx) => tx.gas,
            Self::FeeMarket(tx) => tx.gas,
            Self::Blob(tx) => tx.gas,
            Self::SetCode(tx) => tx.gas,
        }
    }

    /// Recipient, or create. Blob and set-code transactions are always
    /// calls.
    pub const fn to(&self) -> TxKind {
        match self {
            Self::Legacy(tx) => tx.to,
            Self::AccessList(tx) => tx.to,
            Self::FeeMarket(tx) => tx.to,
            Self::Blob(tx) => TxKind::Call(tx.to),
            Self::SetCode(tx) => TxKind::Call(tx.to),
        }
    }

    /// Wei transferred to the recipient.
    pub const fn value(&self) -> U256 {
        match self {
            Self::Legacy(tx) => tx.value,
            Self::AccessList(tx) => tx.value,
            Self::FeeMarket(tx) => tx.value,
            Self::Blob(tx) => tx.value,
            Self::SetCode(tx) => tx.value,
        }
    }

    /// Call data or init code.
    pub const fn data(&self) -> &Bytes {
        match self {
            Self::Legacy(tx) => &tx.data,
            Self::AccessList(tx) => &tx.data,
            Self::FeeMarket(tx) => &tx.data,
            Self::Blob(tx) => &tx.data,
            Self::SetCode(tx) => &tx.data,
        }
    }

    /// The transaction's access list; empty for legacy transactions.
    pub fn access_list(&self) -> &[AccessListEntry] {
        match self {
            Self::Legacy(_) => &[],
            Self::AccessList(tx) => &tx.access_list,
            Self::FeeMarket(tx) => &tx.access_list,
            Self::Blob(tx) => &tx.access_list,
            Self::SetCode(tx) => &tx.access_list,
        }
    }

    /// The declared gas price for pre-1559 pricing, if applicable.
    pub const fn gas_price(&self) -> Option<u128> {
        match self {
            Self::Legacy(tx) => Some(tx.gas_price),
            Self::AccessList(tx) => Some(tx.gas_price),
            _ => None,
        }
    }

    /// The 1559-style fee cap, if applicable.
    pub const fn max_fee_per_gas(&self) -> Option<u128> {
        match self {
            Self::FeeMarket(tx) => Some(tx.max_fee_per_gas),
            Self::Blob(tx) => Some(tx.max_fee_per_gas),
            Self::SetCode(tx) => Some(tx.max_fee_per_gas),
            _ => None,
        }
    }

    /// The 1559-style priority fee cap, if applicable.
    pub const fn max_priority_fee_per_gas(&self) -> Option<u128> {
        match self {
            Self::FeeMarket(tx) => Some(tx.max_priority_fee_per_gas),
            Self::Blob(tx) => Some(tx.max_priority_fee_per_gas),
            Self::SetCode(tx) => Some(tx.max_priority_fee_per_gas),
            _ => None,
        }
    }

    /// The blob fee cap of an EIP-4844 transaction.
    pub const fn max_fee_per_blob_gas(&self) -> Option<u128> {
        match self {
            Self::Blob(tx) => Some(tx.max_fee_per_blob_gas),
            _ => None,
        }
    }

    /// The versioned hashes of the carried blobs; empty for non-blob
    /// transactions.
    pub fn blob_versioned_hashes(&self) -> &[B256] {
        match self {
            Self::Blob(tx) => &tx.blob_versioned_hashes,
            _ => &[],
        }
    }

    /// The authorization list of a set-code transaction; empty otherwise.
    pub fn authorizations(&self) -> &[Authorization] {
        match self {
            Self::SetCode(tx) => &tx.authorizations,
            _ => &[],
        }
    }

    /// Returns `true` if the transaction creates a contract.
    pub const fn is_create(&self) -> bool {
        matches!(self.to(), TxKind::Create)
    }

    /// Appends the EIP-2718 encoding: the bare RLP list for legacy
    /// transactions, the type byte followed by the RLP body otherwise.
    pub fn encode_2718(&self, out: &mut Vec<u8>) {
        match self {
            Self::Legacy(tx) => tx.encode(out),
            Self::AccessList(tx) => {
                out.push(TxType::AccessList.byte());
                tx.encode(out);
            }
            Self::FeeMarket(tx) => {
                out.push(TxType::FeeMarket.byte());
                tx.encode(out);
            }
            Self::Blob(tx) => {
                out.push(TxType::Blob.byte());
                tx.encode(out);
            }
            Self::SetCode(tx) => {
                out.push(TxType::SetCode.byte());
                tx.encode(out);
            }
        }
    }

    /// Returns the EIP-2718 encoding as an owned buffer.
    pub fn encoded_2718(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_2718(&mut out);
        out
    }

    /// Decodes the EIP-2718 encoding, rejecting trailing bytes.
    pub fn decode_2718(mut buf: &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        let tx = if first >= alloy_rlp::EMPTY_LIST_CODE {
            Self::Legacy(LegacyTx::decode(&mut buf)?)
        } else {
            let body = &mut &buf[1..];
            let tx = match first {
                0x01 => Self::AccessList(AccessListTx::decode(body)?),
                0x02 => Self::FeeMarket(FeeMarketTx::decode(body)?),
                0x03 => Self::Blob(BlobTx::decode(body)?),
                0x04 => Self::SetCode(SetCodeTx::decode(body)?),
                _ => return Err(alloy_rlp::Error::Custom("unknown transaction type")),
            };
            buf = *body;
            tx
        };
        if !buf.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }
        Ok(tx)
    }

    /// Computes the transaction hash, the keccak of the 2718 encoding.
    pub fn hash(&self) -> B256 {
        keccak256(self.encoded_2718())
    }
}

impl Encodable for Transaction {
    /// Encodes the in-block form: legacy transactions inline as a list,
    /// typed transactions as a byte string wrapping the 2718 envelope.
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match self {
            Self::Legacy(tx) => tx.encode(out),
            _ => self.encoded_2718()[..].encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            Self::Legacy(tx) => tx.length(),
            _ => {
                let payload_length = self.encoded_2718().len();
                payload_length
                    + alloy_rlp::Header { list: false, payload_length }.length()
            }
        }
    }
}

impl Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        if first >= alloy_rlp::EMPTY_LIST_CODE {
            Ok(Self::Legacy(LegacyTx::decode(buf)?))
        } else {
            let envelope = Bytes::decode(buf)?;
            Self::decode_2718(&envelope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    fn fee_market_tx() -> Transaction {
        Transaction::FeeMarket(FeeMarketTx {
            chain_id: 1,
            nonce: 7,
            max_priority_fee_per_gas: 2_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas: 21_000,
            to: TxKind::Call(address!("2222222222222222222222222222222222222222")),
            value: U256::from(10u64.pow(18)),
            data: Bytes::new(),
            access_list: vec![AccessListEntry {
                address: address!("3333333333333333333333333333333333333333"),
                storage_keys: vec![b256!(
                    "0000000000000000000000000000000000000000000000000000000000000001"
                )],
            }],
            y_parity: 1,
            r: U256::from(1),
            s: U256::from(2),
        })
    }

    #[test]
    fn test_typed_round_trip_2718() {
        let tx = fee_market_tx();
        let encoded = tx.encoded_2718();
        assert_eq!(encoded[0], 0x02);
        assert_eq!(Transaction::decode_2718(&encoded).unwrap(), tx);
    }

    #[test]
    fn test_legacy_round_trip_2718() {
        let tx = Transaction::Legacy(LegacyTx {
            nonce: 0,
            gas_price: 10_000_000_000,
            gas: 21_000,
            to: TxKind::Call(address!("1111111111111111111111111111111111111111")),
            value: U256::from(1),
            data: Bytes::new(),
            v: U256::from(37),
            r: U256::from(5),
            s: U256::from(6),
        });
        let encoded = tx.encoded_2718();
        assert!(encoded[0] >= alloy_rlp::EMPTY_LIST_CODE);
        assert_eq!(Transaction::decode_2718(&encoded).unwrap(), tx);
    }

    #[test]
    fn test_in_block_form_wraps_typed_as_string() {
        let tx = fee_market_tx();
        let mut in_block = Vec::new();
        tx.encode(&mut in_block);
        assert_eq!(in_block.len(), tx.length());
        // The in-block item is an RLP string, not a list.
        assert!(in_block[0] < alloy_rlp::EMPTY_LIST_CODE);
        assert_eq!(Transaction::decode(&mut in_block.as_slice()).unwrap(), tx);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = fee_market_tx().encoded_2718();
        encoded.push(0x00);
        assert!(Transaction::decode_2718(&encoded).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(Transaction::decode_2718(&[0x05, 0xc0]).is_err());
    }

    #[test]
    fn test_non_canonical_rlp_rejected() {
        // A single byte below 0x80 encodes as itself; the long form must
        // not decode.
        assert!(Bytes::decode(&mut &[0x81u8, 0x00][..]).is_err());
        assert_eq!(
            Bytes::decode(&mut &[0x00u8][..]).unwrap(),
            Bytes::from_static(&[0x00]),
        );
    }

    #[test]
    fn test_create_has_empty_to() {
        let tx = Transaction::Legacy(LegacyTx { to: TxKind::Create, ..Default::default() });
        assert!(tx.is_create());
        let encoded = tx.encoded_2718();
        // The canonical empty `to` is an empty byte string.
        assert!(encoded.contains(&alloy_rlp::EMPTY_STRING_CODE));
    }
}
