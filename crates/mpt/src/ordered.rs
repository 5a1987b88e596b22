//! Index-keyed tries over block-ordered collections (transactions,
//! receipts, withdrawals).

use crate::Trie;
use alloc::vec::Vec;
use alloy_primitives::{Bytes, B256};
use alloy_rlp::Encodable;

/// Builds an unsecured trie over the collection, keying each item by the
/// RLP of its index and valuing it with a custom encoder.
pub fn ordered_trie_with_encoder<T, F>(items: &[T], mut encode: F) -> Trie<Bytes>
where
    F: FnMut(&T, &mut Vec<u8>),
{
    let mut trie = Trie::new_unsecured();
    let mut index_buffer = Vec::new();
    let mut value_buffer = Vec::new();

    for (index, item) in items.iter().enumerate() {
        index_buffer.clear();
        (index as u64).encode(&mut index_buffer);

        value_buffer.clear();
        encode(item, &mut value_buffer);

        trie.insert(
            Bytes::copy_from_slice(&index_buffer),
            Bytes::copy_from_slice(&value_buffer),
        );
    }
    trie
}

/// Computes the root of an index-keyed trie over RLP-encodable items.
pub fn ordered_trie_root<T: Encodable>(items: &[T]) -> B256 {
    ordered_trie_with_encoder(items, |item, buf| item.encode(buf)).root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_trie::EMPTY_ROOT_HASH;

    #[test]
    fn test_empty_ordered_trie() {
        assert_eq!(ordered_trie_root::<Bytes>(&[]), EMPTY_ROOT_HASH);
    }

    #[test]
    fn test_ordered_trie_is_insertion_order_independent() {
        // The root depends only on the index keys, which the builder
        // assigns, so two identical collections must agree.
        let items =
            [Bytes::from_static(b"first"), Bytes::from_static(b"second"), Bytes::from_static(b"third")];
        let a = ordered_trie_with_encoder(&items, |item, buf| item.encode(buf)).root();
        let b = ordered_trie_root(&items);
        assert_eq!(a, b);
    }
}
