//! The world-state model for the silex state-transition engine:
//! accounts, storage, transient storage, and the nested snapshot
//! discipline that gives call frames and transactions atomicity.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod account;
pub use account::{Account, TrieAccount, KECCAK_EMPTY};

mod state;
pub use state::{State, StateError};
