//! The bytecode interpreter of the silex state-transition engine: a
//! 256-bit stack machine with fork-gated gas accounting, warm/cold access
//! tracking, nested call/create frames under snapshot control, and the
//! full precompile set.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod errors;
pub use errors::{VmError, VmResult};

pub mod gas;

mod stack;
pub use stack::Stack;

mod memory;
pub use memory::{buffer_read, Memory};

mod env;
pub use env::{BlockEnv, TxEnv};

mod message;
pub use message::{
    compute_contract_address, compute_create2_contract_address, prepare_message, Message,
};

mod evm;
pub use evm::Evm;

mod interpreter;
pub use interpreter::{
    process_create_message, process_message, process_message_call, MessageCallOutput,
};

mod opcodes;
pub use opcodes::Opcode;

pub mod precompiles;
