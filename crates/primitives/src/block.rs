//! This module contains the [Block] body and the [Withdrawal] record.

use crate::{Header, Transaction};
use alloc::vec::Vec;
use alloy_primitives::{Address, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};

/// Wei per Gwei. Withdrawal amounts are denominated in Gwei.
pub const GWEI_TO_WEI: u64 = 1_000_000_000;

/// A consensus-layer withdrawal credited to an execution-layer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct Withdrawal {
    /// Monotonic withdrawal counter.
    pub index: u64,
    /// Index of the withdrawing validator.
    pub validator_index: u64,
    /// Recipient of the withdrawn ether.
    pub address: Address,
    /// Amount withdrawn, in Gwei.
    pub amount: u64,
}

impl Withdrawal {
    /// The withdrawn amount converted to Wei.
    pub fn amount_wei(&self) -> U256 {
        U256::from(self.amount) * U256::from(GWEI_TO_WEI)
    }
}

/// A complete block: header plus body.
///
/// `withdrawals` is present from Shanghai onward; `ommers` must be empty
/// from Paris onward.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The transactions, in execution order.
    pub transactions: Vec<Transaction>,
    /// The ommer (uncle) headers.
    pub ommers: Vec<Header>,
    /// The consensus-layer withdrawals, Shanghai onward.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl Block {
    fn payload_length(&self) -> usize {
        let mut length =
            self.header.length() + self.transactions.length() + self.ommers.length();
        if let Some(withdrawals) = &self.withdrawals {
            length += withdrawals.length();
        }
        length
    }
}

impl Encodable for Block {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        self.header.encode(out);
        self.transactions.encode(out);
        self.ommers.encode(out);
        if let Some(withdrawals) = &self.withdrawals {
            withdrawals.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for Block {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = alloy_rlp::Header::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();

        let mut this = Self {
            header: Decodable::decode(buf)?,
            transactions: Decodable::decode(buf)?,
            ommers: Decodable::decode(buf)?,
            withdrawals: None,
        };
        if started_len - buf.len() < rlp_head.payload_length {
            this.withdrawals = Some(Decodable::decode(buf)?);
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
    use crate::LegacyTx;
    use alloc::vec;
    use alloy_primitives::keccak256;

    #[test]
    fn test_block_round_trip_pre_shanghai() {
        let block = Block {
            header: Header { number: 5, gas_limit: 8_000_000, ..Default::default() },
            transactions: vec![Transaction::Legacy(LegacyTx {
                gas: 21_000,
                v: U256::from(27),
                r: U256::from(1),
                s: U256::from(2),
                ..Default::default()
            })],
            ommers: vec![],
            withdrawals: None,
        };
        let mut encoded = Vec::new();
        block.encode(&mut encoded);
        assert_eq!(encoded.len(), block.length());
        assert_eq!(Block::decode(&mut encoded.as_slice()).unwrap(), block);
    }

    #[test]
    fn test_block_round_trip_with_withdrawals() {
        let block = Block {
            header: Header {
                base_fee_per_gas: Some(7),
                withdrawals_root: Some(Default::default()),
                ..Default::default()
            },
            transactions: vec![],
            ommers: vec![],
            withdrawals: Some(vec![Withdrawal {
                index: 1,
                validator_index: 42,
                address: Address::with_last_byte(0xaa),
                amount: 3,
            }]),
        };
        let mut encoded = Vec::new();
        block.encode(&mut encoded);
        assert_eq!(Block::decode(&mut encoded.as_slice()).unwrap(), block);
    }

    #[test]
    fn test_withdrawal_amount_is_gwei() {
        let withdrawal = Withdrawal { amount: 3, ..Default::default() };
        assert_eq!(withdrawal.amount_wei(), U256::from(3_000_000_000u64));
    }

    #[test]
    fn test_empty_ommer_list_hash() {
        // keccak(rlp([])), the required `ommers_hash` from Paris onward.
        let encoded: [u8; 1] = [alloy_rlp::EMPTY_LIST_CODE];
        assert_eq!(
            keccak256(encoded),
            alloy_primitives::b256!(
                "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
            ),
        );
    }
}
