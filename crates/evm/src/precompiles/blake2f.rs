//! The BLAKE2b compression-function precompile (EIP-152).

use crate::{gas::GAS_BLAKE2_PER_ROUND, Evm, VmError, VmResult};
use alloc::vec::Vec;

/// The exact input length: rounds ∥ h ∥ m ∥ t ∥ f.
const INPUT_LENGTH: usize = 213;

/// The BLAKE2b initialization vector.
const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

/// The message-word schedule, cycled per round.
const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

/// The mixing function G.
fn mix(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

/// The F compression function with a caller-chosen round count.
fn compress_inner(h: &mut [u64; 8], m: &[u64; 16], t: [u64; 2], last: bool, rounds: u32) {
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t[0];
    v[13] ^= t[1];
    if last {
        v[14] = !v[14];
    }

    for round in 0..rounds {
        let s = &SIGMA[round as usize % 10];
        mix(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        mix(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        mix(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        mix(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        mix(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        mix(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        mix(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        mix(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

pub(crate) fn compress(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    if data.len() != INPUT_LENGTH {
        return Err(VmError::InvalidParameter);
    }

    let rounds = u32::from_be_bytes(data[..4].try_into().expect("length was checked"));
    evm.charge_gas(GAS_BLAKE2_PER_ROUND * rounds as u64)?;

    let mut h = [0u64; 8];
    for (i, chunk) in data[4..68].chunks_exact(8).enumerate() {
        h[i] = u64::from_le_bytes(chunk.try_into().expect("chunks are 8 bytes"));
    }
    let mut m = [0u64; 16];
    for (i, chunk) in data[68..196].chunks_exact(8).enumerate() {
        m[i] = u64::from_le_bytes(chunk.try_into().expect("chunks are 8 bytes"));
    }
    let t = [
        u64::from_le_bytes(data[196..204].try_into().expect("length was checked")),
        u64::from_le_bytes(data[204..212].try_into().expect("length was checked")),
    ];
    let last = match data[212] {
        0 => false,
        1 => true,
        _ => return Err(VmError::InvalidParameter),
    };

    compress_inner(&mut h, &m, t, last, rounds);

    let mut output = Vec::with_capacity(64);
    for word in h {
        output.extend_from_slice(&word.to_le_bytes());
    }
    evm.output = output.into();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The EIP-152 "abc" vector: 12 rounds over the initialized
    /// blake2b-512 state must produce the canonical digest of "abc".
    #[test]
    fn test_eip152_abc_vector() {
        // h: the blake2b IV with the parameter block (digest length 64,
        // fanout 1, depth 1) folded into the first word.
        let mut h = IV;
        h[0] ^= 0x0101_0040;

        // m: "abc" in the first message block, zero elsewhere.
        let mut m = [0u64; 16];
        m[0] = u64::from_le_bytes(*b"abc\0\0\0\0\0");

        compress_inner(&mut h, &m, [3, 0], true, 12);

        let mut output = Vec::new();
        for word in h {
            output.extend_from_slice(&word.to_le_bytes());
        }
        assert_eq!(
            alloy_primitives::hex::encode(output),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923",
        );
    }
}
