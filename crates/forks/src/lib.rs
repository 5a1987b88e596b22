//! Fork capability for the silex state-transition engine.
//!
//! Protocol behavior is gated on EIP activation rather than on fork names:
//! execution code asks [Fork::eip] whether a given EIP is live, and the
//! per-fork tables in this crate answer. A [ForkSchedule] resolves which
//! fork governs a block from its number and timestamp, and a [ChainSpec]
//! bundles the schedule with the chain id supplied by the embedder.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod fork;
pub use fork::Fork;

mod schedule;
pub use schedule::{ChainSpec, ForkActivation, ForkSchedule};
