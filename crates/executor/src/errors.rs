//! The two error families that surface from block execution.

use alloy_primitives::Address;
use silex_primitives::SignatureError;

/// A [Result] type alias where the error is [InvalidBlock].
pub type ExecutorResult<T> = Result<T, InvalidBlock>;

/// A transaction that may not be included in a block. Inside block
/// execution this is fatal for the whole block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransaction {
    /// The gas limit is below the intrinsic cost or the calldata floor.
    #[error("insufficient gas for intrinsic cost")]
    InsufficientIntrinsicGas,
    /// The nonce sits at the 2^64 − 1 ceiling.
    #[error("nonce overflow")]
    NonceOverflow,
    /// The nonce is below the sender's.
    #[error("nonce too low")]
    NonceTooLow,
    /// The nonce is above the sender's.
    #[error("nonce too high")]
    NonceTooHigh,
    /// The sender carries code that is not an EIP-7702 delegation.
    #[error("sender is not an EOA")]
    SenderNotEoa,
    /// The sender cannot cover the maximum gas fee plus the value.
    #[error("insufficient sender balance")]
    InsufficientBalance,
    /// Signature validation or recovery failed.
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),
    /// The transaction does not fit in the block's remaining gas.
    #[error("gas allowance exceeded")]
    GasAllowanceExceeded,
    /// The gas limit exceeds the EIP-7825 cap.
    #[error("transaction gas limit cap exceeded")]
    GasLimitCapExceeded,
    /// `maxPriorityFeePerGas` exceeds `maxFeePerGas`.
    #[error("priority fee greater than max fee")]
    PriorityFeeGreaterThanMaxFee,
    /// `maxFeePerGas` is below the block base fee.
    #[error("max fee per gas below base fee")]
    MaxFeeBelowBaseFee,
    /// A legacy gas price below the block base fee.
    #[error("gas price below base fee")]
    GasPriceBelowBaseFee,
    /// Init code larger than the EIP-3860 ceiling.
    #[error("init code too large")]
    InitCodeTooLarge,
    /// A blob transaction carrying no blobs.
    #[error("blob transaction without blobs")]
    NoBlobData,
    /// More blobs than a block admits.
    #[error("too many blobs")]
    TooManyBlobs,
    /// A blob versioned hash with an unknown version byte.
    #[error("invalid blob versioned hash")]
    InvalidVersionedHash,
    /// `maxFeePerBlobGas` below the block's blob gas price.
    #[error("insufficient max fee per blob gas")]
    InsufficientMaxFeePerBlobGas,
    /// The blob gas does not fit in the block's remaining allowance.
    #[error("blob gas allowance exceeded")]
    BlobGasAllowanceExceeded,
    /// The transaction type is not enabled at the block's fork.
    #[error("transaction type {0} not supported at this fork")]
    TypeNotSupported(u8),
    /// A set-code transaction with no authorizations.
    #[error("empty authorization list")]
    EmptyAuthorizationList,
}

/// A block the chain must reject. Any failure before the final commit
/// rolls the state back to the pre-block checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBlock {
    /// The header's parent hash does not match the parent.
    #[error("invalid parent hash")]
    InvalidParentHash,
    /// The block number is not parent + 1.
    #[error("invalid block number")]
    InvalidNumber,
    /// The timestamp does not advance past the parent's.
    #[error("invalid timestamp")]
    InvalidTimestamp,
    /// The gas limit violates the adjustment band or the minimum.
    #[error("invalid gas limit")]
    InvalidGasLimit,
    /// Header gas used exceeds the gas limit, or does not match the
    /// execution outcome.
    #[error("invalid gas used")]
    InvalidGasUsed,
    /// The base fee does not follow the EIP-1559 schedule.
    #[error("invalid base fee")]
    InvalidBaseFee,
    /// The excess blob gas does not follow the EIP-4844 recurrence.
    #[error("invalid excess blob gas")]
    InvalidExcessBlobGas,
    /// Header blob gas used does not match the executed transactions.
    #[error("invalid blob gas used")]
    InvalidBlobGasUsed,
    /// Non-zero difficulty or nonce after Paris.
    #[error("invalid proof-of-work fields")]
    InvalidPowFields,
    /// Extra data longer than 32 bytes.
    #[error("extra data too long")]
    ExtraDataTooLong,
    /// A fork-gated header field is missing or must not be present.
    #[error("header field {0} not valid at this fork")]
    InvalidHeaderField(&'static str),
    /// The ommers do not match the header, or exist after Paris.
    #[error("invalid ommers")]
    InvalidOmmers,
    /// The block's RLP encoding exceeds the EIP-7934 cap.
    #[error("block RLP too large")]
    BlockRlpTooLarge,
    /// The computed state root differs from the header's.
    #[error("invalid state root")]
    InvalidStateRoot,
    /// The computed transactions root differs from the header's.
    #[error("invalid transactions root")]
    InvalidTransactionsRoot,
    /// The computed receipt root differs from the header's.
    #[error("invalid receipt root")]
    InvalidReceiptRoot,
    /// The computed withdrawals root differs from the header's.
    #[error("invalid withdrawals root")]
    InvalidWithdrawalsRoot,
    /// The computed requests hash differs from the header's.
    #[error("invalid requests hash")]
    InvalidRequestsHash,
    /// The computed logs bloom differs from the header's.
    #[error("invalid logs bloom")]
    InvalidBloom,
    /// A checked system-call target carries no code.
    #[error("system contract {0} has no code")]
    SystemContractEmpty(Address),
    /// A checked system call reverted or halted.
    #[error("system contract call to {0} failed")]
    SystemContractCallFailed(Address),
    /// A deposit-contract log does not follow the fixed event layout.
    #[error("invalid deposit event layout")]
    InvalidDepositEventLayout,
    /// The chain has no parent block to build on.
    #[error("missing parent block")]
    MissingParent,
    /// A contained transaction is invalid.
    #[error("invalid transaction: {0}")]
    Transaction(#[from] InvalidTransaction),
}
