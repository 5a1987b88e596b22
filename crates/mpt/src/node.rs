//! This module contains the [TrieNode] type and its canonical RLP form.

use alloc::{boxed::Box, vec, vec::Vec};
use alloy_primitives::{keccak256, Bytes, B256};
use alloy_rlp::{Encodable, Header, EMPTY_STRING_CODE};

/// Flag nibble for even-length extension node paths.
const PREFIX_EXTENSION_EVEN: u8 = 0;

/// Flag nibble for odd-length extension node paths.
const PREFIX_EXTENSION_ODD: u8 = 1;

/// Flag nibble for even-length leaf node paths.
const PREFIX_LEAF_EVEN: u8 = 2;

/// Flag nibble for odd-length leaf node paths.
const PREFIX_LEAF_ODD: u8 = 3;

/// A node within a Merkle-Patricia trie.
///
/// Nodes exist only transiently, while a root is being computed; the trie
/// itself stores flat key/value entries (see [Trie]).
///
/// [Trie]: crate::Trie
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TrieNode {
    /// The empty node.
    Empty,
    /// A leaf node is a 2-item node with the encoding
    /// `rlp([encoded_path, value])`.
    Leaf {
        /// The remainder of the key, as unpacked nibbles.
        path: Vec<u8>,
        /// The value of the leaf node.
        value: Bytes,
    },
    /// An extension node is a 2-item pointer node with the encoding
    /// `rlp([encoded_path, child])`.
    Extension {
        /// The shared nibble prefix of every key below this node.
        path: Vec<u8>,
        /// The single child node.
        child: Box<TrieNode>,
    },
    /// A branch node refers to up to 16 child nodes with the encoding
    /// `rlp([v0, ..., v15, value])`.
    Branch {
        /// The 16 children, indexed by the next key nibble.
        children: Box<[TrieNode; 16]>,
        /// The value of a key that terminates exactly at this node, or
        /// empty bytes when no such key exists.
        value: Bytes,
    },
}

impl TrieNode {
    /// Returns the RLP encoding of this node.
    pub fn rlp_encoded(&self) -> Vec<u8> {
        match self {
            Self::Empty => vec![EMPTY_STRING_CODE],
            Self::Leaf { path, value } => {
                let encoded_path = encode_path(path, true);
                let mut payload = Vec::new();
                encoded_path[..].encode(&mut payload);
                value[..].encode(&mut payload);
                wrap_list(payload)
            }
            Self::Extension { path, child } => {
                let encoded_path = encode_path(path, false);
                let mut payload = Vec::new();
                encoded_path[..].encode(&mut payload);
                payload.extend_from_slice(&child.commitment());
                wrap_list(payload)
            }
            Self::Branch { children, value } => {
                let mut payload = Vec::new();
                for child in children.iter() {
                    payload.extend_from_slice(&child.commitment());
                }
                value[..].encode(&mut payload);
                wrap_list(payload)
            }
        }
    }

    /// Returns the fragment embedded in the parent node's RLP: the node's
    /// own RLP when it encodes to fewer than 32 bytes, otherwise the
    /// keccak of that RLP as a 32-byte RLP string.
    pub fn commitment(&self) -> Vec<u8> {
        match self {
            Self::Empty => vec![EMPTY_STRING_CODE],
            _ => {
                let encoded = self.rlp_encoded();
                if encoded.len() < 32 {
                    encoded
                } else {
                    let mut out = Vec::with_capacity(33);
                    keccak256(&encoded)[..].encode(&mut out);
                    out
                }
            }
        }
    }

    /// Returns the 32-byte root commitment of the trie rooted at this
    /// node.
    pub fn root_hash(&self) -> B256 {
        keccak256(self.rlp_encoded())
    }
}

/// Prepends an RLP list header to the given payload.
fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

/// Packs a nibble path into the hex-prefix ("compact") byte encoding,
/// with the leaf flag set in the high nibble of the first byte.
pub(crate) fn encode_path(nibbles: &[u8], leaf: bool) -> Vec<u8> {
    let odd = nibbles.len() % 2 == 1;
    let flag = match (leaf, odd) {
        (false, false) => PREFIX_EXTENSION_EVEN,
        (false, true) => PREFIX_EXTENSION_ODD,
        (true, false) => PREFIX_LEAF_EVEN,
        (true, true) => PREFIX_LEAF_ODD,
    };

    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd {
        out.push(flag << 4 | nibbles[0]);
        &nibbles[1..]
    } else {
        out.push(flag << 4);
        nibbles
    };
    for pair in rest.chunks_exact(2) {
        out.push(pair[0] << 4 | pair[1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, bytes, hex};
    use alloy_trie::EMPTY_ROOT_HASH;

    #[test]
    fn test_encode_path_even_leaf() {
        assert_eq!(encode_path(&[0x6, 0x4, 0x6, 0xf], true), hex!("20646f"));
    }

    #[test]
    fn test_encode_path_odd_leaf() {
        assert_eq!(encode_path(&[0xf, 0x1, 0xc, 0xb, 0x8], true), hex!("3f1cb8"));
    }

    #[test]
    fn test_encode_path_even_extension() {
        assert_eq!(encode_path(&[0x6, 0x4, 0x6, 0xf], false), hex!("00646f"));
    }

    #[test]
    fn test_encode_path_odd_extension() {
        assert_eq!(encode_path(&[0x1, 0x2, 0x3, 0x4, 0x5], false), hex!("112345"));
    }

    #[test]
    fn test_empty_node_root_is_empty_trie_root() {
        assert_eq!(TrieNode::Empty.root_hash(), EMPTY_ROOT_HASH);
        assert_eq!(
            TrieNode::Empty.root_hash(),
            b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"),
        );
    }

    #[test]
    fn test_leaf_rlp() {
        // rlp([ "20646f", "76657262ff" ])
        let leaf =
            TrieNode::Leaf { path: vec![0x6, 0x4, 0x6, 0xf], value: bytes!("76657262ff") };
        assert_eq!(leaf.rlp_encoded(), hex!("ca8320646f8576657262ff"));
    }

    #[test]
    fn test_small_node_inlined_in_parent() {
        let leaf = TrieNode::Leaf { path: vec![0x0], value: bytes!("8a74657374207468726565") };
        let commitment = leaf.commitment();
        // Short nodes embed their raw RLP rather than a hash.
        assert_eq!(commitment, leaf.rlp_encoded());
        assert!(commitment.len() < 32);
    }
}
