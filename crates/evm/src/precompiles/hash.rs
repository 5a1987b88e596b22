//! The SHA2-256, RIPEMD-160 and identity precompiles.

use crate::{
    gas::{
        GAS_IDENTITY, GAS_IDENTITY_WORD, GAS_RIPEMD160, GAS_RIPEMD160_WORD, GAS_SHA256,
        GAS_SHA256_WORD,
    },
    Evm, VmResult,
};
use alloc::vec::Vec;
use ripemd::{Digest as _, Ripemd160};
use sha2::Sha256;

fn data_words(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

pub(crate) fn sha256(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_SHA256 + GAS_SHA256_WORD * data_words(data.len()))?;

    evm.output = Sha256::digest(&data).to_vec().into();
    Ok(())
}

pub(crate) fn ripemd160(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_RIPEMD160 + GAS_RIPEMD160_WORD * data_words(data.len()))?;

    // The 20-byte digest is left-padded into a 32-byte word.
    let mut output = Vec::with_capacity(32);
    output.extend_from_slice(&[0u8; 12]);
    output.extend_from_slice(&Ripemd160::digest(&data));
    evm.output = output.into();
    Ok(())
}

pub(crate) fn identity(evm: &mut Evm<'_>) -> VmResult<()> {
    let data = evm.message.data.clone();
    evm.charge_gas(GAS_IDENTITY + GAS_IDENTITY_WORD * data_words(data.len()))?;

    evm.output = data;
    Ok(())
}
