//! This module contains the flat [Trie] accumulator and its
//! patricialization into [TrieNode]s.

use crate::node::TrieNode;
use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_rlp::Encodable;
use alloy_trie::Nibbles;

/// A value that can live in a [Trie].
///
/// The trie stores each value's leaf payload. Values equal to their
/// default form are absent: inserting one deletes the key.
pub trait TrieValue: Clone {
    /// Appends the leaf payload for this value to `out`.
    fn encode_value(&self, out: &mut Vec<u8>);

    /// Returns `true` if this value is the type's default, i.e. absent
    /// from the trie.
    fn is_default(&self) -> bool;
}

impl TrieValue for Bytes {
    /// Byte-string values are stored raw; the caller has already produced
    /// the canonical encoding (an RLP'd record or a type-prefixed
    /// envelope).
    fn encode_value(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl TrieValue for U256 {
    /// Storage slots are stored as the RLP of their minimal big-endian
    /// form.
    fn encode_value(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }

    fn is_default(&self) -> bool {
        self.is_zero()
    }
}

/// A Merkle-Patricia trie, kept as flat key/value entries and
/// patricialized on demand by [Self::root].
///
/// Secured tries (state, storage) hash each key with keccak256 before
/// nibble-expanding it; unsecured tries (transactions, receipts,
/// withdrawals) use the key bytes directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Trie<V> {
    secured: bool,
    data: BTreeMap<Bytes, V>,
}

impl<V: TrieValue> Trie<V> {
    /// Creates an empty secured trie.
    pub const fn new_secured() -> Self {
        Self { secured: true, data: BTreeMap::new() }
    }

    /// Creates an empty unsecured trie.
    pub const fn new_unsecured() -> Self {
        Self { secured: false, data: BTreeMap::new() }
    }

    /// Inserts a value under the given key. Inserting a value in its
    /// default form deletes the key.
    pub fn insert(&mut self, key: Bytes, value: V) {
        if value.is_default() {
            self.data.remove(&key);
        } else {
            self.data.insert(key, value);
        }
    }

    /// Returns the value under the given key, if present.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.data.get(key)
    }

    /// Returns `true` if the trie holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of entries in the trie.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Computes the canonical 32-byte root commitment of the trie's
    /// current contents.
    pub fn root(&self) -> B256 {
        let entries = self
            .data
            .iter()
            .map(|(key, value)| {
                let path = if self.secured {
                    Nibbles::unpack(keccak256(key))
                } else {
                    Nibbles::unpack(key)
                };
                let mut payload = Vec::new();
                value.encode_value(&mut payload);
                (path.to_vec(), Bytes::from(payload))
            })
            .collect::<Vec<_>>();
        patricialize(entries, 0).root_hash()
    }
}

impl<V: TrieValue> Default for Trie<V> {
    fn default() -> Self {
        Self::new_unsecured()
    }
}

/// Structurally folds a set of `(nibble path, leaf payload)` entries into
/// a [TrieNode], consuming the paths from `depth` onward.
///
/// A shared prefix across every entry becomes an extension node, a
/// divergence becomes a 16-way branch (holding the value of a key that
/// ends exactly at the divergence point), and a lone entry becomes a
/// leaf.
fn patricialize(entries: Vec<(Vec<u8>, Bytes)>, depth: usize) -> TrieNode {
    if entries.is_empty() {
        return TrieNode::Empty;
    }
    if entries.len() == 1 {
        let (path, value) = entries.into_iter().next().expect("one entry");
        return TrieNode::Leaf { path: path[depth..].to_vec(), value };
    }

    // Find the longest nibble prefix shared by every remaining path.
    let mut prefix_len = entries[0].0.len() - depth;
    for (path, _) in &entries[1..] {
        let candidate = &entries[0].0[depth..];
        let mut shared = 0;
        while shared < prefix_len
            && depth + shared < path.len()
            && path[depth + shared] == candidate[shared]
        {
            shared += 1;
        }
        prefix_len = shared;
        if prefix_len == 0 {
            break;
        }
    }

    if prefix_len > 0 {
        let path = entries[0].0[depth..depth + prefix_len].to_vec();
        let child = patricialize(entries, depth + prefix_len);
        return TrieNode::Extension { path, child: Box::new(child) };
    }

    let mut buckets: [Vec<(Vec<u8>, Bytes)>; 16] = Default::default();
    let mut value = Bytes::new();
    for (path, payload) in entries {
        if path.len() == depth {
            value = payload;
        } else {
            buckets[path[depth] as usize].push((path, payload));
        }
    }

    let children = buckets.map(|bucket| patricialize(bucket, depth + 1));
    TrieNode::Branch { children: Box::new(children), value }
}
