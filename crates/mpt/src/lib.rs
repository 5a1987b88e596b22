//! An implementation of the Merkle-Patricia trie commitments used by the
//! Ethereum state-transition function: the secured tries for accounts and
//! storage, and the unsecured index tries for transactions, receipts and
//! withdrawals.
//!
//! Tries here are write-only accumulators: entries are inserted (inserting
//! a value's default form deletes), and [Trie::root] patricializes the
//! current contents into the canonical 32-byte commitment. Nodes are
//! transient to root computation and never persisted.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod node;
pub use node::TrieNode;

mod trie;
pub use trie::{Trie, TrieValue};

mod ordered;
pub use ordered::{ordered_trie_root, ordered_trie_with_encoder};

pub use alloy_trie::EMPTY_ROOT_HASH;
