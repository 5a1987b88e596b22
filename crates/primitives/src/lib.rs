//! Consensus data types for the silex state-transition engine: headers,
//! blocks, withdrawals, receipts, and the five transaction shapes with
//! their signing and sender-recovery rules.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod header;
pub use header::Header;

mod block;
pub use block::{Block, Withdrawal, GWEI_TO_WEI};

mod receipt;
pub use receipt::{Receipt, ReceiptEnvelope, ReceiptOutcome};

mod transaction;
pub use transaction::{
    AccessListEntry, AccessListTx, BlobTx, FeeMarketTx, LegacyTx, SetCodeTx, Transaction, TxType,
    VERSIONED_HASH_VERSION_KZG,
};

mod signature;
pub use signature::{recover_address, recover_sender, signing_hash, SignatureError, SECP256K1N};

mod authorization;
pub use authorization::{
    delegation_target, is_delegation_designation, recover_authority, Authorization,
    EOA_DELEGATION_PREFIX,
};

pub use alloy_primitives::{logs_bloom, Log};
