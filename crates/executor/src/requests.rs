//! Execution-layer requests (EIP-7685): deposit harvesting and the
//! block's requests hash.

use crate::{
    constants::DEPOSIT_CONTRACT_ADDRESS,
    errors::InvalidBlock,
};
use alloc::vec::Vec;
use alloy_primitives::{b256, Bytes, B256, U256};
use sha2::{Digest as _, Sha256};
use silex_primitives::Log;

/// The request type tag of a deposit request.
const DEPOSIT_REQUEST_TYPE: u8 = 0x00;

/// `keccak("DepositEvent(bytes,bytes,bytes,bytes,bytes)")`.
const DEPOSIT_EVENT_SIGNATURE_HASH: B256 =
    b256!("649bbc62d0e31342afea4e5cd82d4049e7e1ee912fc0889aa790803be39038c5");

/// The fixed ABI length of one deposit event payload.
const DEPOSIT_EVENT_LENGTH: usize = 576;

const PUBKEY_OFFSET: usize = 160;
const WITHDRAWAL_CREDENTIALS_OFFSET: usize = 256;
const AMOUNT_OFFSET: usize = 320;
const SIGNATURE_OFFSET: usize = 384;
const INDEX_OFFSET: usize = 512;

const PUBKEY_SIZE: usize = 48;
const WITHDRAWAL_CREDENTIALS_SIZE: usize = 32;
const AMOUNT_SIZE: usize = 8;
const SIGNATURE_SIZE: usize = 96;
const INDEX_SIZE: usize = 8;

/// Scans the block's logs for deposit events and concatenates their
/// payloads into one type-prefixed deposit request (EIP-6110), or
/// `None` when the block carries no deposits.
pub fn parse_deposit_requests(logs: &[Log]) -> Result<Option<Bytes>, InvalidBlock> {
    let mut deposits = Vec::new();
    for log in logs {
        if log.address == DEPOSIT_CONTRACT_ADDRESS
            && log.topics().first() == Some(&DEPOSIT_EVENT_SIGNATURE_HASH)
        {
            deposits.extend_from_slice(&extract_deposit_data(&log.data.data)?);
        }
    }
    if deposits.is_empty() {
        return Ok(None);
    }

    let mut request = Vec::with_capacity(1 + deposits.len());
    request.push(DEPOSIT_REQUEST_TYPE);
    request.extend_from_slice(&deposits);
    Ok(Some(request.into()))
}

/// Validates the fixed 576-byte ABI layout of one deposit event and
/// extracts `pubkey ∥ withdrawal_credentials ∥ amount ∥ signature ∥
/// index`.
fn extract_deposit_data(data: &[u8]) -> Result<Vec<u8>, InvalidBlock> {
    if data.len() != DEPOSIT_EVENT_LENGTH {
        return Err(InvalidBlock::InvalidDepositEventLayout);
    }

    let expect_word = |at: usize, value: usize| -> Result<(), InvalidBlock> {
        if U256::from_be_slice(&data[at..at + 32]) == U256::from(value) {
            Ok(())
        } else {
            Err(InvalidBlock::InvalidDepositEventLayout)
        }
    };
    // Five dynamic-offset words, then a length word ahead of each field.
    expect_word(0, PUBKEY_OFFSET)?;
    expect_word(32, WITHDRAWAL_CREDENTIALS_OFFSET)?;
    expect_word(64, AMOUNT_OFFSET)?;
    expect_word(96, SIGNATURE_OFFSET)?;
    expect_word(128, INDEX_OFFSET)?;
    expect_word(PUBKEY_OFFSET, PUBKEY_SIZE)?;
    expect_word(WITHDRAWAL_CREDENTIALS_OFFSET, WITHDRAWAL_CREDENTIALS_SIZE)?;
    expect_word(AMOUNT_OFFSET, AMOUNT_SIZE)?;
    expect_word(SIGNATURE_OFFSET, SIGNATURE_SIZE)?;
    expect_word(INDEX_OFFSET, INDEX_SIZE)?;

    let mut deposit =
        Vec::with_capacity(PUBKEY_SIZE + WITHDRAWAL_CREDENTIALS_SIZE + AMOUNT_SIZE + SIGNATURE_SIZE + INDEX_SIZE);
    deposit.extend_from_slice(&data[PUBKEY_OFFSET + 32..PUBKEY_OFFSET + 32 + PUBKEY_SIZE]);
    deposit.extend_from_slice(
        &data[WITHDRAWAL_CREDENTIALS_OFFSET + 32
            ..WITHDRAWAL_CREDENTIALS_OFFSET + 32 + WITHDRAWAL_CREDENTIALS_SIZE],
    );
    deposit.extend_from_slice(&data[AMOUNT_OFFSET + 32..AMOUNT_OFFSET + 32 + AMOUNT_SIZE]);
    deposit
        .extend_from_slice(&data[SIGNATURE_OFFSET + 32..SIGNATURE_OFFSET + 32 + SIGNATURE_SIZE]);
    deposit.extend_from_slice(&data[INDEX_OFFSET + 32..INDEX_OFFSET + 32 + INDEX_SIZE]);
    Ok(deposit)
}

/// `sha256(sha256(r_1) ∥ sha256(r_2) ∥ …)` over the block's requests
/// (EIP-7685).
pub fn compute_requests_hash(requests: &[Bytes]) -> B256 {
    let mut hasher = Sha256::new();
    for request in requests {
        hasher.update(Sha256::digest(request));
    }
    B256::from_slice(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::LogData;

    fn deposit_log(data: Vec<u8>) -> Log {
        Log {
            address: DEPOSIT_CONTRACT_ADDRESS,
            data: LogData::new_unchecked(
                alloc::vec![DEPOSIT_EVENT_SIGNATURE_HASH],
                data.into(),
            ),
        }
    }

    fn well_formed_event() -> Vec<u8> {
        let mut data = alloc::vec![0u8; DEPOSIT_EVENT_LENGTH];
        let mut put_word = |at: usize, value: u64| {
            data[at..at + 32].copy_from_slice(&U256::from(value).to_be_bytes::<32>());
        };
        put_word(0, PUBKEY_OFFSET as u64);
        put_word(32, WITHDRAWAL_CREDENTIALS_OFFSET as u64);
        put_word(64, AMOUNT_OFFSET as u64);
        put_word(96, SIGNATURE_OFFSET as u64);
        put_word(128, INDEX_OFFSET as u64);
        put_word(PUBKEY_OFFSET, PUBKEY_SIZE as u64);
        put_word(WITHDRAWAL_CREDENTIALS_OFFSET, WITHDRAWAL_CREDENTIALS_SIZE as u64);
        put_word(AMOUNT_OFFSET, AMOUNT_SIZE as u64);
        put_word(SIGNATURE_OFFSET, SIGNATURE_SIZE as u64);
        put_word(INDEX_OFFSET, INDEX_SIZE as u64);
        data
    }

    #[test]
    fn test_deposit_extraction() {
        let mut event = well_formed_event();
        event[PUBKEY_OFFSET + 32] = 0xaa;

        let request = parse_deposit_requests(&[deposit_log(event)]).unwrap().unwrap();
        assert_eq!(request[0], DEPOSIT_REQUEST_TYPE);
        // 48 + 32 + 8 + 96 + 8 bytes of payload.
        assert_eq!(request.len(), 1 + 192);
        assert_eq!(request[1], 0xaa);
    }

    #[test]
    fn test_malformed_offset_rejected() {
        let mut event = well_formed_event();
        event[31] = 0x00;
        assert_eq!(
            parse_deposit_requests(&[deposit_log(event)]),
            Err(InvalidBlock::InvalidDepositEventLayout),
        );
    }

    #[test]
    fn test_foreign_logs_ignored() {
        let mut log = deposit_log(well_formed_event());
        log.address = alloy_primitives::Address::with_last_byte(0x99);
        assert_eq!(parse_deposit_requests(&[log]).unwrap(), None);
    }

    #[test]
    fn test_requests_hash_of_empty_set() {
        // sha256 of empty input.
        assert_eq!(
            compute_requests_hash(&[]),
            b256!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"),
        );
    }
}
