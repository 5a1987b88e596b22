//! This module contains the [Receipt] type and its typed envelope.

use crate::TxType;
use alloc::{vec, vec::Vec};
use alloy_primitives::{logs_bloom, Bloom, Log, B256};
use alloy_rlp::{Decodable, Encodable};

/// The execution outcome recorded in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// The intermediate state root, recorded pre-Byzantium.
    PostState(B256),
    /// The success flag, recorded from Byzantium onward (EIP-658).
    Status(bool),
}

/// The result of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Post-state root or success flag, depending on the fork.
    pub outcome: ReceiptOutcome,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Bloom filter over this transaction's logs.
    pub bloom: Bloom,
    /// The logs emitted by this transaction, in emission order.
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Builds a receipt, deriving the bloom from the logs.
    pub fn new(outcome: ReceiptOutcome, cumulative_gas_used: u64, logs: Vec<Log>) -> Self {
        let bloom = logs_bloom(logs.iter());
        Self { outcome, cumulative_gas_used, bloom, logs }
    }

    fn payload_length(&self) -> usize {
        let outcome_length = match self.outcome {
            ReceiptOutcome::PostState(root) => root.length(),
            ReceiptOutcome::Status(status) => status.length(),
        };
        outcome_length
            + self.cumulative_gas_used.length()
            + self.bloom.length()
            + self.logs.length()
    }
}

impl Encodable for Receipt {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        match self.outcome {
            ReceiptOutcome::PostState(root) => root.encode(out),
            ReceiptOutcome::Status(status) => status.encode(out),
        }
        self.cumulative_gas_used.encode(out);
        self.bloom.encode(out);
        self.logs.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for Receipt {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = alloy_rlp::Header::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }

        // A 32-byte string opens a pre-Byzantium receipt; anything shorter
        // is the status flag.
        let outcome = if buf.first() == Some(&0xa0) {
            ReceiptOutcome::PostState(Decodable::decode(buf)?)
        } else {
            ReceiptOutcome::Status(Decodable::decode(buf)?)
        };

        Ok(Self {
            outcome,
            cumulative_gas_used: Decodable::decode(buf)?,
            bloom: Decodable::decode(buf)?,
            logs: Decodable::decode(buf)?,
        })
    }
}

/// A receipt tagged with its transaction's type, serialized with the same
/// EIP-2718 prefix as the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptEnvelope {
    /// The type of the transaction this receipt belongs to.
    pub tx_type: TxType,
    /// The inner receipt.
    pub receipt: Receipt,
}

impl ReceiptEnvelope {
    /// Appends the EIP-2718 encoding: the bare receipt RLP for legacy
    /// transactions, the type byte followed by the RLP otherwise.
    pub fn encode_2718(&self, out: &mut Vec<u8>) {
        if self.tx_type != TxType::Legacy {
            out.push(self.tx_type.byte());
        }
        self.receipt.encode(out);
    }

    /// Returns the EIP-2718 encoding as an owned buffer.
    pub fn encoded_2718(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_2718(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, LogData};

    fn sample_log() -> Log {
        Log {
            address: address!("000000000000000000000000000000000000c0de"),
            data: LogData::new_unchecked(
                vec![b256!("00000000000000000000000000000000000000000000000000000000000000ff")],
                alloy_primitives::Bytes::from_static(b"payload"),
            ),
        }
    }

    #[test]
    fn test_status_receipt_round_trip() {
        let receipt =
            Receipt::new(ReceiptOutcome::Status(true), 21_000, vec![sample_log()]);
        let mut encoded = Vec::new();
        receipt.encode(&mut encoded);
        assert_eq!(encoded.len(), receipt.length());
        assert_eq!(Receipt::decode(&mut encoded.as_slice()).unwrap(), receipt);
    }

    #[test]
    fn test_post_state_receipt_round_trip() {
        let receipt = Receipt::new(
            ReceiptOutcome::PostState(B256::with_last_byte(9)),
            100_000,
            vec![],
        );
        let mut encoded = Vec::new();
        receipt.encode(&mut encoded);
        assert_eq!(Receipt::decode(&mut encoded.as_slice()).unwrap(), receipt);
    }

    #[test]
    fn test_typed_receipt_envelope_prefix() {
        let receipt = Receipt::new(ReceiptOutcome::Status(false), 55_000, vec![]);
        let legacy =
            ReceiptEnvelope { tx_type: TxType::Legacy, receipt: receipt.clone() };
        let blob = ReceiptEnvelope { tx_type: TxType::Blob, receipt };

        assert!(legacy.encoded_2718()[0] >= 0xc0);
        assert_eq!(blob.encoded_2718()[0], 0x03);
        assert_eq!(&blob.encoded_2718()[1..], legacy.encoded_2718().as_slice());
    }

    #[test]
    fn test_bloom_marks_address_and_topics() {
        let receipt = Receipt::new(ReceiptOutcome::Status(true), 0, vec![sample_log()]);
        assert_ne!(receipt.bloom, Bloom::ZERO);
        // The bloom of a log is reproducible from the log alone.
        assert_eq!(receipt.bloom, logs_bloom([sample_log()].iter()));
    }
}
