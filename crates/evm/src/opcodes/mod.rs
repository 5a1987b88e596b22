//! Opcode decoding and dispatch.
//!
//! [Opcode::from_byte] is the fork-indexed instruction table: bytes that
//! are undefined at the active fork decode to `None` and halt the frame
//! with [VmError::InvalidOpcode].
//!
//! [VmError::InvalidOpcode]: crate::VmError::InvalidOpcode

use crate::{Evm, VmResult};
use silex_forks::Fork;
use silex_state::State;

mod arithmetic;
mod bitwise;
mod block;
mod control;
mod environment;
mod keccak;
mod log;
mod memory_ops;
mod storage;
mod system;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs, reason = "the variants are the EVM instruction set")]
pub enum Opcode {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Clz,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    PrevRandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    TLoad,
    TStore,
    MCopy,
    /// PUSH0 through PUSH32; the payload is the immediate width.
    Push(u8),
    /// DUP1 through DUP16; the payload is the duplicated depth.
    Dup(u8),
    /// SWAP1 through SWAP16; the payload is the swapped depth.
    Swap(u8),
    /// LOG0 through LOG4; the payload is the topic count.
    Log(u8),
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    SelfDestruct,
}

impl Opcode {
    /// Decodes one instruction byte under the given fork's rule set.
    pub fn from_byte(byte: u8, fork: Fork) -> Option<Self> {
        let op = match byte {
            0x00 => Self::Stop,
            0x01 => Self::Add,
            0x02 => Self::Mul,
            0x03 => Self::Sub,
            0x04 => Self::Div,
            0x05 => Self::SDiv,
            0x06 => Self::Mod,
            0x07 => Self::SMod,
            0x08 => Self::AddMod,
            0x09 => Self::MulMod,
            0x0a => Self::Exp,
            0x0b => Self::SignExtend,
            0x10 => Self::Lt,
            0x11 => Self::Gt,
            0x12 => Self::SLt,
            0x13 => Self::SGt,
            0x14 => Self::Eq,
            0x15 => Self::IsZero,
            0x16 => Self::And,
            0x17 => Self::Or,
            0x18 => Self::Xor,
            0x19 => Self::Not,
            0x1a => Self::Byte,
            0x1b if fork.eip(145) => Self::Shl,
            0x1c if fork.eip(145) => Self::Shr,
            0x1d if fork.eip(145) => Self::Sar,
            0x1e if fork.eip(7939) => Self::Clz,
            0x20 => Self::Keccak256,
            0x30 => Self::Address,
            0x31 => Self::Balance,
            0x32 => Self::Origin,
            0x33 => Self::Caller,
            0x34 => Self::CallValue,
            0x35 => Self::CallDataLoad,
            0x36 => Self::CallDataSize,
            0x37 => Self::CallDataCopy,
            0x38 => Self::CodeSize,
            0x39 => Self::CodeCopy,
            0x3a => Self::GasPrice,
            0x3b => Self::ExtCodeSize,
            0x3c => Self::ExtCodeCopy,
            0x3d if fork.eip(211) => Self::ReturnDataSize,
            0x3e if fork.eip(211) => Self::ReturnDataCopy,
            0x3f if fork.eip(1052) => Self::ExtCodeHash,
            0x40 => Self::BlockHash,
            0x41 => Self::Coinbase,
            0x42 => Self::Timestamp,
            0x43 => Self::Number,
            0x44 => Self::PrevRandao,
            0x45 => Self::GasLimit,
            0x46 if fork.eip(1344) => Self::ChainId,
            0x47 if fork.eip(1884) => Self::SelfBalance,
            0x48 if fork.eip(3198) => Self::BaseFee,
            0x49 if fork.eip(4844) => Self::BlobHash,
            0x4a if fork.eip(7516) => Self::BlobBaseFee,
            0x50 => Self::Pop,
            0x51 => Self::MLoad,
            0x52 => Self::MStore,
            0x53 => Self::MStore8,
            0x54 => Self::SLoad,
            0x55 => Self::SStore,
            0x56 => Self::Jump,
            0x57 => Self::JumpI,
            0x58 => Self::Pc,
            0x59 => Self::MSize,
            0x5a => Self::Gas,
            0x5b => Self::JumpDest,
            0x5c if fork.eip(1153) => Self::TLoad,
            0x5d if fork.eip(1153) => Self::TStore,
            0x5e if fork.eip(5656) => Self::MCopy,
            0x5f if fork.eip(3855) => Self::Push(0),
            0x60..=0x7f => Self::Push(byte - 0x5f),
            0x80..=0x8f => Self::Dup(byte - 0x7f),
            0x90..=0x9f => Self::Swap(byte - 0x8f),
            0xa0..=0xa4 => Self::Log(byte - 0xa0),
            0xf0 => Self::Create,
            0xf1 => Self::Call,
            0xf2 => Self::CallCode,
            0xf3 => Self::Return,
            0xf4 if fork.eip(7) => Self::DelegateCall,
            0xf5 if fork.eip(1014) => Self::Create2,
            0xfa if fork.eip(214) => Self::StaticCall,
            0xfd if fork.eip(140) => Self::Revert,
            0xff => Self::SelfDestruct,
            _ => return None,
        };
        Some(op)
    }
}

/// Executes one decoded instruction against the frame and state.
pub(crate) fn execute(evm: &mut Evm<'_>, state: &mut State, op: Opcode) -> VmResult<()> {
    match op {
        Opcode::Stop => control::stop(evm),
        Opcode::Add => arithmetic::add(evm),
        Opcode::Mul => arithmetic::mul(evm),
        Opcode::Sub => arithmetic::sub(evm),
        Opcode::Div => arithmetic::div(evm),
        Opcode::SDiv => arithmetic::sdiv(evm),
        Opcode::Mod => arithmetic::rem(evm),
        Opcode::SMod => arithmetic::srem(evm),
        Opcode::AddMod => arithmetic::addmod(evm),
        Opcode::MulMod => arithmetic::mulmod(evm),
        Opcode::Exp => arithmetic::exp(evm),
        Opcode::SignExtend => arithmetic::signextend(evm),
        Opcode::Lt => bitwise::lt(evm),
        Opcode::Gt => bitwise::gt(evm),
        Opcode::SLt => bitwise::slt(evm),
        Opcode::SGt => bitwise::sgt(evm),
        Opcode::Eq => bitwise::eq(evm),
        Opcode::IsZero => bitwise::is_zero(evm),
        Opcode::And => bitwise::and(evm),
        Opcode::Or => bitwise::or(evm),
        Opcode::Xor => bitwise::xor(evm),
        Opcode::Not => bitwise::not(evm),
        Opcode::Byte => bitwise::byte(evm),
        Opcode::Shl => bitwise::shl(evm),
        Opcode::Shr => bitwise::shr(evm),
        Opcode::Sar => bitwise::sar(evm),
        Opcode::Clz => bitwise::clz(evm),
        Opcode::Keccak256 => keccak::keccak256(evm),
        Opcode::Address => environment::address(evm),
        Opcode::Balance => environment::balance(evm, state),
        Opcode::Origin => environment::origin(evm),
        Opcode::Caller => environment::caller(evm),
        Opcode::CallValue => environment::callvalue(evm),
        Opcode::CallDataLoad => environment::calldataload(evm),
        Opcode::CallDataSize => environment::calldatasize(evm),
        Opcode::CallDataCopy => environment::calldatacopy(evm),
        Opcode::CodeSize => environment::codesize(evm),
        Opcode::CodeCopy => environment::codecopy(evm),
        Opcode::GasPrice => environment::gasprice(evm),
        Opcode::ExtCodeSize => environment::extcodesize(evm, state),
        Opcode::ExtCodeCopy => environment::extcodecopy(evm, state),
        Opcode::ReturnDataSize => environment::returndatasize(evm),
        Opcode::ReturnDataCopy => environment::returndatacopy(evm),
        Opcode::ExtCodeHash => environment::extcodehash(evm, state),
        Opcode::BlockHash => block::blockhash(evm),
        Opcode::Coinbase => block::coinbase(evm),
        Opcode::Timestamp => block::timestamp(evm),
        Opcode::Number => block::number(evm),
        Opcode::PrevRandao => block::prev_randao(evm),
        Opcode::GasLimit => block::gas_limit(evm),
        Opcode::ChainId => block::chain_id(evm),
        Opcode::SelfBalance => environment::self_balance(evm, state),
        Opcode::BaseFee => block::base_fee(evm),
        Opcode::BlobHash => environment::blob_hash(evm),
        Opcode::BlobBaseFee => block::blob_base_fee(evm),
        Opcode::Pop => control::pop(evm),
        Opcode::MLoad => memory_ops::mload(evm),
        Opcode::MStore => memory_ops::mstore(evm),
        Opcode::MStore8 => memory_ops::mstore8(evm),
        Opcode::SLoad => storage::sload(evm, state),
        Opcode::SStore => storage::sstore(evm, state),
        Opcode::Jump => control::jump(evm),
        Opcode::JumpI => control::jumpi(evm),
        Opcode::Pc => control::pc(evm),
        Opcode::MSize => memory_ops::msize(evm),
        Opcode::Gas => control::gas_left(evm),
        Opcode::JumpDest => control::jumpdest(evm),
        Opcode::TLoad => storage::tload(evm, state),
        Opcode::TStore => storage::tstore(evm, state),
        Opcode::MCopy => memory_ops::mcopy(evm),
        Opcode::Push(n) => control::push(evm, n),
        Opcode::Dup(n) => control::dup(evm, n),
        Opcode::Swap(n) => control::swap(evm, n),
        Opcode::Log(n) => log::log_n(evm, n),
        Opcode::Create => system::create(evm, state),
        Opcode::Call => system::call(evm, state),
        Opcode::CallCode => system::callcode(evm, state),
        Opcode::Return => system::return_(evm),
        Opcode::DelegateCall => system::delegatecall(evm, state),
        Opcode::Create2 => system::create2(evm, state),
        Opcode::StaticCall => system::staticcall(evm, state),
        Opcode::Revert => system::revert(evm),
        Opcode::SelfDestruct => system::selfdestruct(evm, state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_gated_decode() {
        assert_eq!(Opcode::from_byte(0x5f, Fork::Shanghai), Some(Opcode::Push(0)));
        assert_eq!(Opcode::from_byte(0x5f, Fork::Paris), None);

        assert_eq!(Opcode::from_byte(0xfd, Fork::Byzantium), Some(Opcode::Revert));
        assert_eq!(Opcode::from_byte(0xfd, Fork::SpuriousDragon), None);

        assert_eq!(Opcode::from_byte(0x5c, Fork::Cancun), Some(Opcode::TLoad));
        assert_eq!(Opcode::from_byte(0x5c, Fork::Shanghai), None);

        assert_eq!(Opcode::from_byte(0x1e, Fork::Osaka), Some(Opcode::Clz));
        assert_eq!(Opcode::from_byte(0x1e, Fork::Prague), None);
    }

    #[test]
    fn test_invalid_designated_opcode() {
        // 0xfe is the designated invalid instruction at every fork.
        assert_eq!(Opcode::from_byte(0xfe, Fork::Osaka), None);
        assert_eq!(Opcode::from_byte(0xfe, Fork::Frontier), None);
    }

    #[test]
    fn test_push_dup_swap_ranges() {
        assert_eq!(Opcode::from_byte(0x60, Fork::Frontier), Some(Opcode::Push(1)));
        assert_eq!(Opcode::from_byte(0x7f, Fork::Frontier), Some(Opcode::Push(32)));
        assert_eq!(Opcode::from_byte(0x80, Fork::Frontier), Some(Opcode::Dup(1)));
        assert_eq!(Opcode::from_byte(0x9f, Fork::Frontier), Some(Opcode::Swap(16)));
        assert_eq!(Opcode::from_byte(0xa4, Fork::Frontier), Some(Opcode::Log(4)));
    }
}
