//! This module contains the [Header] type and its fork-sensitive RLP
//! form.

use alloc::vec::Vec;
use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256};
use alloy_rlp::{Decodable, Encodable};

/// An execution-layer block header.
///
/// The trailing `Option` fields entered the protocol at later forks; a
/// header's RLP contains exactly the fields that exist at its block's
/// fork, in declaration order. Builders must therefore populate a
/// contiguous prefix of the optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Hash of the parent block's header.
    pub parent_hash: B256,
    /// Hash of the RLP of the ommer header list.
    pub ommers_hash: B256,
    /// Beneficiary of priority fees (and of rewards, pre-Paris).
    pub coinbase: Address,
    /// Root of the world state after this block executes.
    pub state_root: B256,
    /// Root of the unsecured trie over this block's transactions.
    pub transactions_root: B256,
    /// Root of the unsecured trie over this block's receipts.
    pub receipt_root: B256,
    /// Union of the bloom filters of every log in the block.
    pub bloom: Bloom,
    /// Proof-of-work difficulty; zero from Paris onward.
    pub difficulty: U256,
    /// Block height.
    pub number: u64,
    /// Gas ceiling for the block.
    pub gas_limit: u64,
    /// Total gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Block timestamp, in seconds.
    pub timestamp: u64,
    /// Arbitrary proposer data, at most 32 bytes.
    pub extra_data: Bytes,
    /// The RANDAO reveal (the PoW mix hash, pre-Paris).
    pub prev_randao: B256,
    /// PoW nonce; the literal 8-byte buffer, zero from Paris onward.
    pub nonce: B64,
    /// EIP-1559 base fee, London onward.
    pub base_fee_per_gas: Option<u64>,
    /// Root of the unsecured trie over withdrawals, Shanghai onward.
    pub withdrawals_root: Option<B256>,
    /// Blob gas consumed by the block, Cancun onward.
    pub blob_gas_used: Option<u64>,
    /// Running blob gas excess, Cancun onward.
    pub excess_blob_gas: Option<u64>,
    /// Parent beacon block root, Cancun onward.
    pub parent_beacon_block_root: Option<B256>,
    /// Commitment to the block's execution requests, Prague onward.
    pub requests_hash: Option<B256>,
}

impl Header {
    /// Computes the block hash, the keccak of the header RLP.
    pub fn hash(&self) -> B256 {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        keccak256(out)
    }

    fn payload_length(&self) -> usize {
        let mut length = self.parent_hash.length()
            + self.ommers_hash.length()
            + self.coinbase.length()
            + self.state_root.length()
            + self.transactions_root.length()
            + self.receipt_root.length()
            + self.bloom.length()
            + self.difficulty.length()
            + self.number.length()
            + self.gas_limit.length()
            + self.gas_used.length()
            + self.timestamp.length()
            + self.extra_data.length()
            + self.prev_randao.length()
            + self.nonce.length();
        if let Some(base_fee) = self.base_fee_per_gas {
            length += base_fee.length();
        }
        if let Some(root) = self.withdrawals_root {
            length += root.length();
        }
        if let Some(blob_gas_used) = self.blob_gas_used {
            length += blob_gas_used.length();
        }
        if let Some(excess) = self.excess_blob_gas {
            length += excess.length();
        }
        if let Some(root) = self.parent_beacon_block_root {
            length += root.length();
        }
        if let Some(hash) = self.requests_hash {
            length += hash.length();
        }
        length
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        self.parent_hash.encode(out);
        self.ommers_hash.encode(out);
        self.coinbase.encode(out);
        self.state_root.encode(out);
        self.transactions_root.encode(out);
        self.receipt_root.encode(out);
        self.bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.timestamp.encode(out);
        self.extra_data.encode(out);
        self.prev_randao.encode(out);
        self.nonce.encode(out);
        if let Some(base_fee) = self.base_fee_per_gas {
            base_fee.encode(out);
        }
        if let Some(root) = self.withdrawals_root {
            root.encode(out);
        }
        if let Some(blob_gas_used) = self.blob_gas_used {
            blob_gas_used.encode(out);
        }
        if let Some(excess) = self.excess_blob_gas {
            excess.encode(out);
        }
        if let Some(root) = self.parent_beacon_block_root {
            root.encode(out);
        }
        if let Some(hash) = self.requests_hash {
            hash.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for Header {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = alloy_rlp::Header::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();

        let mut this = Self {
            parent_hash: Decodable::decode(buf)?,
            ommers_hash: Decodable::decode(buf)?,
            coinbase: Decodable::decode(buf)?,
            state_root: Decodable::decode(buf)?,
            transactions_root: Decodable::decode(buf)?,
            receipt_root: Decodable::decode(buf)?,
            bloom: Decodable::decode(buf)?,
            difficulty: Decodable::decode(buf)?,
            number: Decodable::decode(buf)?,
            gas_limit: Decodable::decode(buf)?,
            gas_used: Decodable::decode(buf)?,
            timestamp: Decodable::decode(buf)?,
            extra_data: Decodable::decode(buf)?,
            prev_randao: Decodable::decode(buf)?,
            nonce: Decodable::decode(buf)?,
            ..Default::default()
        };

        // Trailing fields are present exactly when the block's fork
        // defines them; decode whatever remains of the payload, in order.
        if started_len - buf.len() < rlp_head.payload_length {
            this.base_fee_per_gas = Some(Decodable::decode(buf)?);
        }
        if started_len - buf.len() < rlp_head.payload_length {
            this.withdrawals_root = Some(Decodable::decode(buf)?);
        }
        if started_len - buf.len() < rlp_head.payload_length {
            this.blob_gas_used = Some(Decodable::decode(buf)?);
        }
        if started_len - buf.len() < rlp_head.payload_length {
            this.excess_blob_gas = Some(Decodable::decode(buf)?);
        }
        if started_len - buf.len() < rlp_head.payload_length {
            this.parent_beacon_block_root = Some(Decodable::decode(buf)?);
        }
        if started_len - buf.len() < rlp_head.payload_length {
            this.requests_hash = Some(Decodable::decode(buf)?);
        }

        let consumed = started_len - buf.len();
        if consumed != rlp_head.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: consumed,
            });
        }
        Ok(this)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, b64};

    fn paris_header() -> Header {
        Header {
            parent_hash: b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
            number: 1,
            gas_limit: 30_000_000,
            timestamp: 12,
            base_fee_per_gas: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_header_rlp_round_trip() {
        let header = paris_header();
        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        assert_eq!(encoded.len(), header.length());
        assert_eq!(Header::decode(&mut encoded.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_header_rlp_round_trip_with_all_trailing_fields() {
        let header = Header {
            withdrawals_root: Some(B256::with_last_byte(1)),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(131_072),
            parent_beacon_block_root: Some(B256::with_last_byte(2)),
            requests_hash: Some(B256::with_last_byte(3)),
            ..paris_header()
        };
        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        assert_eq!(Header::decode(&mut encoded.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_nonce_is_a_literal_buffer() {
        // A pre-Paris nonce with leading zero bytes must round-trip as
        // the full 8-byte string, not a stripped integer.
        let header =
            Header { nonce: b64!("0000000000000042"), difficulty: U256::from(131_072), ..Default::default() };
        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        let decoded = Header::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.nonce, header.nonce);

        // The nonce field is the 8-byte string `0x88 ..`.
        let nonce_encoding: &[u8] = &[0x88, 0, 0, 0, 0, 0, 0, 0, 0x42];
        assert!(encoded.windows(nonce_encoding.len()).any(|w| w == nonce_encoding));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let header = paris_header();
        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        encoded.truncate(encoded.len() - 1);
        assert!(Header::decode(&mut encoded.as_slice()).is_err());
    }

    #[test]
    fn test_hash_commits_to_contents() {
        let a = paris_header();
        let mut b = a.clone();
        b.gas_used = 1;
        assert_ne!(a.hash(), b.hash());
    }
}
