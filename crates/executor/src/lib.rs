//! The block executor and state-transition driver of the silex engine:
//! transaction pre-flight, system transactions, per-transaction
//! execution with receipt assembly, withdrawal and request processing,
//! header validation, and the atomic block commit.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod errors;
pub use errors::{ExecutorResult, InvalidBlock, InvalidTransaction};

mod constants;
pub use constants::{
    BEACON_ROOTS_ADDRESS, CONSOLIDATION_REQUEST_PREDEPLOY_ADDRESS, DEPOSIT_CONTRACT_ADDRESS,
    HISTORY_STORAGE_ADDRESS, MAX_RLP_BLOCK_SIZE, SYSTEM_ADDRESS,
    WITHDRAWAL_REQUEST_PREDEPLOY_ADDRESS,
};

mod preflight;
pub use preflight::{check_transaction, CheckedTransaction};

mod output;
pub use output::BlockOutput;

mod executor;
pub use executor::{apply_body, process_transaction};

mod requests;
pub use requests::{compute_requests_hash, parse_deposit_requests};

mod syscalls;

mod validation;
pub use validation::{
    calculate_base_fee_per_gas, calculate_excess_blob_gas, validate_header, INITIAL_BASE_FEE,
};

mod chain;
pub use chain::BlockChain;
