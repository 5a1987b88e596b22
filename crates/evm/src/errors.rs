//! Errors local to a message frame.

/// A [Result] type alias where the error is [VmError].
pub type VmResult<T> = Result<T, VmError>;

/// A condition that aborts the current message frame.
///
/// These never surface to the block level: the frame's state mutations
/// are rolled back, the parent observes a zero success flag (or the
/// transaction records a failed receipt), and execution continues.
/// [VmError::Revert] is the one non-exceptional member: it preserves the
/// frame's output buffer and remaining gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// An operation popped more items than the stack holds.
    #[error("stack underflow")]
    StackUnderflow,
    /// A push would grow the stack beyond 1024 items.
    #[error("stack overflow")]
    StackOverflow,
    /// The frame's gas counter went below the charge.
    #[error("out of gas")]
    OutOfGas,
    /// The opcode byte is undefined at the active fork.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
    /// A jump targeted something other than a JUMPDEST.
    #[error("invalid jump destination")]
    InvalidJumpDestination,
    /// A state-mutating operation ran inside a static frame.
    #[error("write in static context")]
    WriteInStaticContext,
    /// A read past the end of the return-data buffer.
    #[error("out of bounds read")]
    OutOfBoundsRead,
    /// A create targeted an address that already has code, a nonce, or
    /// storage.
    #[error("address collision")]
    AddressCollision,
    /// Deployed code may not begin with the 0xEF reserved byte
    /// (EIP-3541).
    #[error("invalid contract prefix")]
    InvalidContractPrefix,
    /// A precompile received malformed input.
    #[error("invalid parameter")]
    InvalidParameter,
    /// The point-evaluation precompile rejected the proof.
    #[error("KZG proof verification failed")]
    KzgProofError,
    /// The frame executed REVERT: output preserved, remaining gas
    /// returned.
    #[error("execution reverted")]
    Revert,
}

impl VmError {
    /// Returns `true` for exceptional halts, which consume all remaining
    /// frame gas. [VmError::Revert] does not.
    pub const fn consumes_all_gas(self) -> bool {
        !matches!(self, Self::Revert)
    }
}
