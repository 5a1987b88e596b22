//! The BLS12-381 precompile suite (EIP-2537), over the `blst` bindings.
//!
//! Points arrive as padded big-endian field elements: an Fp is 64 bytes
//! (16 zero bytes then the 48-byte value), a G1 point 128 bytes, a G2
//! point 256 bytes (x then y, each `c0 ∥ c1`). The all-zero encoding is
//! the point at infinity. MSM and pairing inputs must additionally lie
//! in the order-q subgroup; addition inputs only need to be on curve.

use crate::{
    gas::{
        GAS_BLS_G1_ADD, GAS_BLS_G1_MUL, GAS_BLS_G2_ADD, GAS_BLS_G2_MUL,
        GAS_BLS_MAP_FP2_TO_G2, GAS_BLS_MAP_FP_TO_G1, GAS_BLS_PAIRING_BASE,
        GAS_BLS_PAIRING_PER_PAIR,
    },
    Evm, VmError, VmResult,
};
use alloc::{vec, vec::Vec};
use blst::{
    blst_bendian_from_fp, blst_final_exp, blst_fp, blst_fp12, blst_fp12_is_one, blst_fp12_mul,
    blst_fp2, blst_fp_from_bendian, blst_map_to_g1, blst_map_to_g2, blst_miller_loop,
    blst_p1, blst_p1_add_or_double, blst_p1_affine, blst_p1_affine_in_g1,
    blst_p1_affine_is_inf, blst_p1_affine_on_curve, blst_p1_from_affine, blst_p1_mult,
    blst_p1_to_affine, blst_p2, blst_p2_add_or_double, blst_p2_affine, blst_p2_affine_in_g2,
    blst_p2_affine_is_inf, blst_p2_affine_on_curve, blst_p2_from_affine, blst_p2_mult,
    blst_p2_to_affine, blst_scalar, blst_scalar_from_bendian,
};

/// One padded Fp element on the wire.
const PADDED_FP_LENGTH: usize = 64;

/// One G1 point on the wire.
const G1_LENGTH: usize = 2 * PADDED_FP_LENGTH;

/// One G2 point on the wire.
const G2_LENGTH: usize = 4 * PADDED_FP_LENGTH;

/// One `(G1, scalar)` MSM slice.
const G1_MSM_PAIR_LENGTH: usize = G1_LENGTH + 32;

/// One `(G2, scalar)` MSM slice.
const G2_MSM_PAIR_LENGTH: usize = G2_LENGTH + 32;

/// One `(G1, G2)` pairing slice.
const PAIRING_PAIR_LENGTH: usize = G1_LENGTH + G2_LENGTH;

/// The MSM discount denominator.
const MSM_MULTIPLIER: u64 = 1000;

/// The BLS12-381 base field modulus, big endian.
const BLS_FIELD_MODULUS: [u8; 48] = [
    0x1a, 0x01, 0x11, 0xea, 0x39, 0x7f, 0xe6, 0x9a, 0x4b, 0x1b, 0xa7, 0xb6, 0x43, 0x4b, 0xac,
    0xd7, 0x64, 0x77, 0x4b, 0x84, 0xf3, 0x85, 0x12, 0xbf, 0x67, 0x30, 0xd2, 0xa0, 0xf6, 0xb0,
    0xf6, 0x24, 0x1e, 0xab, 0xff, 0xfe, 0xb1, 0x53, 0xff, 0xff, 0xb9, 0xfe, 0xff, 0xff, 0xff,
    0xff, 0xaa, 0xab,
];

/// The G1 MSM discount table for `k = 1..=128` pairs; larger inputs use
/// the final entry.
const G1_MSM_DISCOUNTS: [u64; 128] = [
    1000, 949, 848, 797, 764, 750, 738, 728, 719, 712, 705, 698, 692, 687, 682, 677, 673, 669,
    665, 661, 658, 654, 651, 648, 645, 642, 640, 637, 635, 632, 630, 627, 625, 623, 621, 619,
    617, 615, 613, 611, 609, 608, 606, 604, 603, 601, 599, 598, 596, 595, 593, 592, 591, 589,
    588, 586, 585, 584, 582, 581, 580, 579, 577, 576, 575, 574, 573, 572, 570, 569, 568, 567,
    566, 565, 564, 563, 562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 551, 550, 549,
    548, 547, 547, 546, 545, 544, 543, 542, 541, 540, 540, 539, 538, 537, 536, 536, 535, 534,
    533, 532, 532, 531, 530, 529, 528, 528, 527, 526, 525, 525, 524, 523, 522, 522, 521, 520,
    520, 519,
];

/// The G2 MSM discount table for `k = 1..=128` pairs.
const G2_MSM_DISCOUNTS: [u64; 128] = [
    1000, 1000, 923, 884, 855, 832, 812, 796, 782, 770, 759, 749, 740, 732, 724, 717, 711, 704,
    699, 693, 688, 683, 679, 674, 670, 666, 663, 659, 655, 652, 649, 646, 643, 640, 637, 634,
    632, 629, 627, 624, 622, 620, 618, 615, 613, 611, 609, 607, 606, 604, 602, 600, 598, 597,
    595, 593, 592, 590, 589, 587, 586, 584, 583, 582, 580, 579, 578, 576, 575, 574, 573, 571,
    570, 569, 568, 567, 566, 565, 563, 562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552,
    552, 551, 550, 549, 548, 547, 546, 545, 545, 544, 543, 542, 541, 541, 540, 539, 538, 537,
    537, 536, 535, 535, 534, 533, 532, 532, 531, 530, 530, 529, 528, 528, 527, 526, 526, 525,
    524, 524,
];

/// `k · mul_cost · discount(k) / 1000`.
fn msm_gas(pair_count: usize, mul_cost: u64, discounts: &[u64; 128]) -> u64 {
    let discount = discounts[pair_count.min(128) - 1];
    (pair_count as u64).saturating_mul(mul_cost).saturating_mul(discount) / MSM_MULTIPLIER
}

/// Decodes one padded Fp element: 16 zero bytes of padding, then a
/// canonical (< p) 48-byte big-endian value.
fn decode_fp(bytes: &[u8]) -> VmResult<blst_fp> {
    debug_assert_eq!(bytes.len(), PADDED_FP_LENGTH);
    if bytes[..16].iter().any(|byte| *byte != 0) {
        return Err(VmError::InvalidParameter);
    }
    let value = &bytes[16..];
    if value >= &BLS_FIELD_MODULUS[..] {
        return Err(VmError::InvalidParameter);
    }

    let mut fp = blst_fp::default();
    unsafe { blst_fp_from_bendian(&mut fp, value.as_ptr()) };
    Ok(fp)
}

fn encode_fp(out: &mut [u8], fp: &blst_fp) {
    out[..16].fill(0);
    unsafe { blst_bendian_from_fp(out[16..].as_mut_ptr(), fp) };
}

/// Decodes a G1 point, checking curve membership (always) and subgroup
/// membership (MSM and pairing inputs).
fn decode_g1(bytes: &[u8], subgroup_check: bool) -> VmResult<blst_p1_affine> {
    debug_assert_eq!(bytes.len(), G1_LENGTH);
    if bytes.iter().all(|byte| *byte == 0) {
        return Ok(blst_p1_affine::default());
    }

    let point = blst_p1_affine {
        x: decode_fp(&bytes[..PADDED_FP_LENGTH])?,
        y: decode_fp(&bytes[PADDED_FP_LENGTH..])?,
    };
    if !unsafe { blst_p1_affine_on_curve(&point) } {
        return Err(VmError::InvalidParameter);
    }
    if subgroup_check && !unsafe { blst_p1_affine_in_g1(&point) } {
        return Err(VmError::InvalidParameter);
    }
    Ok(point)
}

fn encode_g1(point: &blst_p1_affine) -> Vec<u8> {
    let mut out = vec![0u8; G1_LENGTH];
    if !unsafe { blst_p1_affine_is_inf(point) } {
        encode_fp(&mut out[..PADDED_FP_LENGTH], &point.x);
        encode_fp(&mut out[PADDED_FP_LENGTH..], &point.y);
    }
    out
}

/// Decodes one Fp2 element, `c0 ∥ c1`.
fn decode_fp2(bytes: &[u8]) -> VmResult<blst_fp2> {
    Ok(blst_fp2 {
        fp: [decode_fp(&bytes[..PADDED_FP_LENGTH])?, decode_fp(&bytes[PADDED_FP_LENGTH..])?],
    })
}

fn decode_g2(bytes: &[u8], subgroup_check: bool) -> VmResult<blst_p2_affine> {
    debug_assert_eq!(bytes.len(), G2_LENGTH);
    if bytes.iter().all(|byte| *byte == 0) {
        return Ok(blst_p2_affine::default());
    }

    let point = blst_p2_affine {
        x: decode_fp2(&bytes[..2 * PADDED_FP_LENGTH])?,
        y: decode_fp2(&bytes[2 * PADDED_FP_LENGTH..])?,
    };
    if !unsafe { blst_p2_affine_on_curve(&point) } {
        return Err(VmError::InvalidParameter);
    }
    if subgroup_check && !unsafe { blst_p2_affine_in_g2(&point) } {
        return Err(VmError::InvalidParameter);
    }
    Ok(point)
}

fn encode_g2(point: &blst_p2_affine) -> Vec<u8> {
    let mut out = vec![0u8; G2_LENGTH];
    if !unsafe { blst_p2_affine_is_inf(point) } {
        encode_fp(&mut out[..PADDED_FP_LENGTH], &point.x.fp[0]);
        encode_fp(&mut out[PADDED_FP_LENGTH..2 * PADDED_FP_LENGTH], &point.x.fp[1]);
        encode_fp(&mut out[2 * PADDED_FP_LENGTH..3 * PADDED_FP_LENGTH], &point.y.fp[0]);
        encode_fp(&mut out[3 * PADDED_FP_LENGTH..], &point.y.fp[1]);
    }
    out
}

pub(crate) fn g1_add(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_BLS_G1_ADD)?;
    if data.len() != 2 * G1_LENGTH {
        return Err(VmError::InvalidParameter);
    }

    let first = decode_g1(&data[..G1_LENGTH], false)?;
    let second = decode_g1(&data[G1_LENGTH..], false)?;

    let mut sum = blst_p1::default();
    let mut sum_affine = blst_p1_affine::default();
    unsafe {
        let mut first_full = blst_p1::default();
        blst_p1_from_affine(&mut first_full, &first);
        let mut second_full = blst_p1::default();
        blst_p1_from_affine(&mut second_full, &second);
        blst_p1_add_or_double(&mut sum, &first_full, &second_full);
        blst_p1_to_affine(&mut sum_affine, &sum);
    }
    evm.output = encode_g1(&sum_affine).into();
    Ok(())
}

pub(crate) fn g1_msm(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    if data.is_empty() || data.len() % G1_MSM_PAIR_LENGTH != 0 {
        return Err(VmError::InvalidParameter);
    }
    let pair_count = data.len() / G1_MSM_PAIR_LENGTH;
    evm.charge_gas(msm_gas(pair_count, GAS_BLS_G1_MUL, &G1_MSM_DISCOUNTS))?;

    let mut accumulator = blst_p1::default();
    for pair in data.chunks_exact(G1_MSM_PAIR_LENGTH) {
        let point = decode_g1(&pair[..G1_LENGTH], true)?;
        if unsafe { blst_p1_affine_is_inf(&point) } {
            continue;
        }
        let mut scalar = blst_scalar::default();
        let mut term = blst_p1::default();
        unsafe {
            blst_scalar_from_bendian(&mut scalar, pair[G1_LENGTH..].as_ptr());
            let mut full = blst_p1::default();
            blst_p1_from_affine(&mut full, &point);
            blst_p1_mult(&mut term, &full, scalar.b.as_ptr(), 256);
            let partial = accumulator;
            blst_p1_add_or_double(&mut accumulator, &partial, &term);
        }
    }

    let mut result = blst_p1_affine::default();
    unsafe { blst_p1_to_affine(&mut result, &accumulator) };
    evm.output = encode_g1(&result).into();
    Ok(())
}

pub(crate) fn g2_add(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_BLS_G2_ADD)?;
    if data.len() != 2 * G2_LENGTH {
        return Err(VmError::InvalidParameter);
    }

    let first = decode_g2(&data[..G2_LENGTH], false)?;
    let second = decode_g2(&data[G2_LENGTH..], false)?;

    let mut sum = blst_p2::default();
    let mut sum_affine = blst_p2_affine::default();
    unsafe {
        let mut first_full = blst_p2::default();
        blst_p2_from_affine(&mut first_full, &first);
        let mut second_full = blst_p2::default();
        blst_p2_from_affine(&mut second_full, &second);
        blst_p2_add_or_double(&mut sum, &first_full, &second_full);
        blst_p2_to_affine(&mut sum_affine, &sum);
    }
    evm.output = encode_g2(&sum_affine).into();
    Ok(())
}

pub(crate) fn g2_msm(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    if data.is_empty() || data.len() % G2_MSM_PAIR_LENGTH != 0 {
        return Err(VmError::InvalidParameter);
    }
    let pair_count = data.len() / G2_MSM_PAIR_LENGTH;
    evm.charge_gas(msm_gas(pair_count, GAS_BLS_G2_MUL, &G2_MSM_DISCOUNTS))?;

    let mut accumulator = blst_p2::default();
    for pair in data.chunks_exact(G2_MSM_PAIR_LENGTH) {
        let point = decode_g2(&pair[..G2_LENGTH], true)?;
        if unsafe { blst_p2_affine_is_inf(&point) } {
            continue;
        }
        let mut scalar = blst_scalar::default();
        let mut term = blst_p2::default();
        unsafe {
            blst_scalar_from_bendian(&mut scalar, pair[G2_LENGTH..].as_ptr());
            let mut full = blst_p2::default();
            blst_p2_from_affine(&mut full, &point);
            blst_p2_mult(&mut term, &full, scalar.b.as_ptr(), 256);
            let partial = accumulator;
            blst_p2_add_or_double(&mut accumulator, &partial, &term);
        }
    }

    let mut result = blst_p2_affine::default();
    unsafe { blst_p2_to_affine(&mut result, &accumulator) };
    evm.output = encode_g2(&result).into();
    Ok(())
}

pub(crate) fn pairing_check(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    if data.is_empty() || data.len() % PAIRING_PAIR_LENGTH != 0 {
        return Err(VmError::InvalidParameter);
    }
    let pair_count = (data.len() / PAIRING_PAIR_LENGTH) as u64;
    evm.charge_gas(GAS_BLS_PAIRING_PER_PAIR * pair_count + GAS_BLS_PAIRING_BASE)?;

    // Infinity pairs contribute the identity and are skipped; the
    // product of the remaining Miller loops must final-exponentiate to
    // one.
    let mut product: Option<blst_fp12> = None;
    for pair in data.chunks_exact(PAIRING_PAIR_LENGTH) {
        let g1 = decode_g1(&pair[..G1_LENGTH], true)?;
        let g2 = decode_g2(&pair[G1_LENGTH..], true)?;
        if unsafe { blst_p1_affine_is_inf(&g1) || blst_p2_affine_is_inf(&g2) } {
            continue;
        }

        let mut term = blst_fp12::default();
        unsafe { blst_miller_loop(&mut term, &g2, &g1) };
        product = Some(match product {
            None => term,
            Some(acc) => {
                let mut next = blst_fp12::default();
                unsafe { blst_fp12_mul(&mut next, &acc, &term) };
                next
            }
        });
    }

    let ok = match product {
        None => true,
        Some(acc) => {
            let mut exped = blst_fp12::default();
            unsafe {
                blst_final_exp(&mut exped, &acc);
                blst_fp12_is_one(&exped)
            }
        }
    };

    let mut output = vec![0u8; 32];
    output[31] = ok as u8;
    evm.output = output.into();
    Ok(())
}

pub(crate) fn map_fp_to_g1(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_BLS_MAP_FP_TO_G1)?;
    if data.len() != PADDED_FP_LENGTH {
        return Err(VmError::InvalidParameter);
    }

    let element = decode_fp(&data)?;
    let mut point = blst_p1::default();
    let mut affine = blst_p1_affine::default();
    unsafe {
        blst_map_to_g1(&mut point, &element, core::ptr::null());
        blst_p1_to_affine(&mut affine, &point);
    }
    evm.output = encode_g1(&affine).into();
    Ok(())
}

pub(crate) fn map_fp2_to_g2(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_BLS_MAP_FP2_TO_G2)?;
    if data.len() != 2 * PADDED_FP_LENGTH {
        return Err(VmError::InvalidParameter);
    }

    let element = decode_fp2(&data)?;
    let mut point = blst_p2::default();
    let mut affine = blst_p2_affine::default();
    unsafe {
        blst_map_to_g2(&mut point, &element, core::ptr::null());
        blst_p2_to_affine(&mut affine, &point);
    }
    evm.output = encode_g2(&affine).into();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msm_discounts_monotone() {
        assert_eq!(msm_gas(1, GAS_BLS_G1_MUL, &G1_MSM_DISCOUNTS), 12_000);
        assert_eq!(msm_gas(2, GAS_BLS_G1_MUL, &G1_MSM_DISCOUNTS), 2 * 12_000 * 949 / 1000);
        // Past 128 pairs the discount pins at the table's tail.
        assert_eq!(
            msm_gas(200, GAS_BLS_G1_MUL, &G1_MSM_DISCOUNTS),
            200 * 12_000 * 519 / 1000,
        );
    }

    #[test]
    fn test_fp_padding_and_range_enforced() {
        let mut bytes = [0u8; PADDED_FP_LENGTH];
        bytes[0] = 1;
        assert_eq!(decode_fp(&bytes).unwrap_err(), VmError::InvalidParameter);

        let mut modulus = [0u8; PADDED_FP_LENGTH];
        modulus[16..].copy_from_slice(&BLS_FIELD_MODULUS);
        assert_eq!(decode_fp(&modulus).unwrap_err(), VmError::InvalidParameter);
    }

    #[test]
    fn test_infinity_round_trips() {
        let inf = decode_g1(&[0u8; G1_LENGTH], true).unwrap();
        assert_eq!(encode_g1(&inf), vec![0u8; G1_LENGTH]);
        let inf2 = decode_g2(&[0u8; G2_LENGTH], true).unwrap();
        assert_eq!(encode_g2(&inf2), vec![0u8; G2_LENGTH]);
    }
}
