//! This module contains the [Account] type and its trie representation.

use alloy_primitives::{b256, keccak256, Bytes, B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// keccak256 of empty input, the code hash of a codeless account.
pub const KECCAK_EMPTY: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// An Ethereum account. Storage lives in a separate map keyed by the
/// account's address; code is held inline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    /// Number of transactions sent from this account (or, for contracts,
    /// contracts created by it).
    pub nonce: u64,
    /// Balance in Wei.
    pub balance: U256,
    /// EVM bytecode, possibly empty.
    pub code: Bytes,
}

impl Account {
    /// An account with zero nonce, zero balance and no code, as the
    /// protocol defines emptiness (EIP-161).
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }

    /// keccak256 of the account's code.
    pub fn code_hash(&self) -> B256 {
        if self.code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&self.code)
        }
    }

    /// Returns `true` if the account has code or a non-zero nonce, the
    /// collision criterion for contract creation.
    pub fn has_code_or_nonce(&self) -> bool {
        self.nonce != 0 || !self.code.is_empty()
    }
}

/// An account as represented in the state trie: the inline code is
/// replaced by its hash and the storage map by its trie root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct TrieAccount {
    /// Account nonce.
    pub nonce: u64,
    /// Account balance.
    pub balance: U256,
    /// Root of the account's storage trie.
    pub storage_root: B256,
    /// Hash of the account's bytecode.
    pub code_hash: B256,
}

impl From<(&Account, B256)> for TrieAccount {
    fn from((account, storage_root): (&Account, B256)) -> Self {
        Self {
            nonce: account.nonce,
            balance: account.balance,
            storage_root,
            code_hash: account.code_hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(Account::default().is_empty());
        assert!(!Account { nonce: 1, ..Default::default() }.is_empty());
        assert!(!Account { balance: U256::from(1), ..Default::default() }.is_empty());
        assert!(!Account { code: Bytes::from_static(b"\x00"), ..Default::default() }.is_empty());
    }

    #[test]
    fn test_empty_code_hash() {
        assert_eq!(Account::default().code_hash(), KECCAK_EMPTY);
        assert_eq!(KECCAK_EMPTY, keccak256([]));
    }
}
