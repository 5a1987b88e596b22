//! The [BlockChain] head and the state-transition driver.

use crate::{
    apply_body,
    constants::MAX_RLP_BLOCK_SIZE,
    errors::{ExecutorResult, InvalidBlock},
    requests::compute_requests_hash,
    validation::validate_header,
};
use alloc::vec::Vec;
use alloy_primitives::{keccak256, B256};
use alloy_rlp::Encodable;
use silex_evm::BlockEnv;
use silex_forks::ChainSpec;
use silex_primitives::{logs_bloom, Block};
use silex_state::State;
use tracing::{debug, info};

/// The number of recent blocks the head retains for BLOCKHASH lookback.
const RETAINED_BLOCKS: usize = 255;

/// The chain head: the retained recent blocks, the current world state,
/// and the chain configuration.
#[derive(Debug, Clone)]
pub struct BlockChain {
    blocks: Vec<Block>,
    /// The world state as of the last committed block.
    pub state: State,
    /// Chain id and fork schedule, supplied by the embedder.
    pub chain_spec: ChainSpec,
}

impl BlockChain {
    /// Creates a chain head from a genesis (or checkpoint) block and its
    /// post-state.
    pub fn new(chain_spec: ChainSpec, base_block: Block, state: State) -> Self {
        Self { blocks: alloc::vec![base_block], state, chain_spec }
    }

    /// The retained blocks, oldest first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The most recently committed block.
    pub fn latest_block(&self) -> &Block {
        self.blocks.last().expect("the chain retains at least its base block")
    }

    /// Hashes of the retained blocks, oldest first, for BLOCKHASH.
    fn recent_block_hashes(&self) -> Vec<B256> {
        self.blocks.iter().map(|block| block.header.hash()).collect()
    }

    /// Attempts to apply a block to the chain.
    ///
    /// Validates the header against the parent, executes the body under
    /// a block-level checkpoint, recomputes every commitment the header
    /// carries, and either commits the block or restores the pre-block
    /// state exactly.
    pub fn state_transition(&mut self, block: Block) -> ExecutorResult<()> {
        let header = &block.header;
        let fork = self.chain_spec.fork_at(header.number, header.timestamp);
        let parent = self.latest_block().header.clone();

        if fork.eip(7934) {
            let mut encoded = Vec::new();
            block.encode(&mut encoded);
            if encoded.len() > MAX_RLP_BLOCK_SIZE {
                return Err(InvalidBlock::BlockRlpTooLarge);
            }
        }

        validate_header(fork, &parent, header)?;

        let mut ommers_encoded = Vec::new();
        block.ommers.encode(&mut ommers_encoded);
        if keccak256(&ommers_encoded) != header.ommers_hash {
            return Err(InvalidBlock::InvalidOmmers);
        }
        if fork.eip(3675) && !block.ommers.is_empty() {
            return Err(InvalidBlock::InvalidOmmers);
        }
        if fork.eip(4895) != block.withdrawals.is_some() {
            return Err(InvalidBlock::InvalidHeaderField("withdrawals"));
        }

        let block_env = BlockEnv {
            fork,
            chain_id: self.chain_spec.chain_id,
            number: header.number,
            coinbase: header.coinbase,
            timestamp: header.timestamp,
            prev_randao: header.prev_randao,
            difficulty: header.difficulty,
            gas_limit: header.gas_limit,
            base_fee_per_gas: header.base_fee_per_gas,
            excess_blob_gas: header.excess_blob_gas,
            parent_beacon_block_root: header.parent_beacon_block_root,
            block_hashes: self.recent_block_hashes(),
        };

        info!(
            target: "executor",
            number = header.number,
            fork = fork.name(),
            "applying block"
        );

        // The block-level checkpoint: any failure from here on restores
        // the pre-block state byte for byte.
        let checkpoint = self.state.clone();
        let result = apply_body(
            &mut self.state,
            &block_env,
            &block.transactions,
            &block.ommers,
            block.withdrawals.as_deref(),
        )
        .and_then(|output| {
            if output.block_gas_used != header.gas_used {
                return Err(InvalidBlock::InvalidGasUsed);
            }
            if output.transactions_trie.root() != header.transactions_root {
                return Err(InvalidBlock::InvalidTransactionsRoot);
            }
            if output.receipts_trie.root() != header.receipt_root {
                return Err(InvalidBlock::InvalidReceiptRoot);
            }
            if logs_bloom(output.block_logs.iter()) != header.bloom {
                return Err(InvalidBlock::InvalidBloom);
            }
            if fork.eip(4895)
                && Some(output.withdrawals_trie.root()) != header.withdrawals_root
            {
                return Err(InvalidBlock::InvalidWithdrawalsRoot);
            }
            if fork.eip(4844) && Some(output.blob_gas_used) != header.blob_gas_used {
                return Err(InvalidBlock::InvalidBlobGasUsed);
            }
            if fork.eip(7685)
                && Some(compute_requests_hash(&output.requests)) != header.requests_hash
            {
                return Err(InvalidBlock::InvalidRequestsHash);
            }
            if self.state.state_root() != header.state_root {
                return Err(InvalidBlock::InvalidStateRoot);
            }
            Ok(())
        });

        if let Err(error) = result {
            debug!(target: "executor", number = header.number, %error, "block rejected");
            self.state = checkpoint;
            return Err(error);
        }

        self.blocks.push(block);
        if self.blocks.len() > RETAINED_BLOCKS {
            let excess = self.blocks.len() - RETAINED_BLOCKS;
            self.blocks.drain(..excess);
        }
        Ok(())
    }
}
