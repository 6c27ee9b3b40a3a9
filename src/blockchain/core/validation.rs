use crate::miner::meets_difficulty;
use thiserror::Error;

use super::chain::Block;
use super::state::BalanceSheet;

/// Why a block failed validation. Rejections are expected outcomes of a
/// lagging or adversarial peer; callers surface them as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockRejection {
    #[error("empty chain")]
    EmptyChain,
    #[error("expected index {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },
    #[error("previous hash {actual} does not match predecessor hash {expected}")]
    PreviousHashMismatch { expected: String, actual: String },
    #[error("block hash is missing")]
    MissingHash,
    #[error("stored hash {stored} does not match content hash {computed}")]
    HashMismatch { stored: String, computed: String },
    #[error("hash {hash} does not have {difficulty} leading zeros")]
    InsufficientWork { hash: String, difficulty: u32 },
    #[error("transaction {position} from {sender} is not covered by its balance")]
    Overdraft { position: usize, sender: String },
    #[error("transaction {position} overflows the balance of {recipient}")]
    BalanceOverflow { position: usize, recipient: String },
}

/// Check index and previous-hash linkage against `prev` (absent only for genesis).
pub fn check_linkage(block: &Block, prev: Option<&Block>) -> Result<(), BlockRejection> {
    match prev {
        Some(prev) => {
            let expected = prev.hash.clone().unwrap_or_else(|| prev.content_hash());
            if block.previous_hash != expected {
                return Err(BlockRejection::PreviousHashMismatch {
                    expected,
                    actual: block.previous_hash.clone(),
                });
            }
            if block.index != prev.index + 1 {
                return Err(BlockRejection::IndexMismatch {
                    expected: prev.index + 1,
                    actual: block.index,
                });
            }
        }
        None => {
            if block.index != 0 {
                return Err(BlockRejection::IndexMismatch {
                    expected: 0,
                    actual: block.index,
                });
            }
        }
    }
    Ok(())
}

/// Check the stored hash against the content and, outside genesis, the work target.
pub fn check_seal(block: &Block) -> Result<(), BlockRejection> {
    let stored = block.hash.as_deref().ok_or(BlockRejection::MissingHash)?;
    let computed = block.content_hash();
    if stored != computed {
        return Err(BlockRejection::HashMismatch {
            stored: stored.to_string(),
            computed,
        });
    }
    if !block.is_genesis() && !meets_difficulty(stored, block.difficulty) {
        return Err(BlockRejection::InsufficientWork {
            hash: stored.to_string(),
            difficulty: block.difficulty,
        });
    }
    Ok(())
}

/// Replay the block's transactions on top of `state`, rejecting any
/// non-coinbase transfer its sender cannot cover at that point.
pub fn check_economics(state: &mut BalanceSheet, block: &Block) -> Result<(), BlockRejection> {
    for (position, tx) in block.transactions.iter().enumerate() {
        if state.credit_overflows(tx) {
            return Err(BlockRejection::BalanceOverflow {
                position,
                recipient: tx.recipient.clone(),
            });
        }
        if !state.try_apply(tx) {
            return Err(BlockRejection::Overdraft {
                position,
                sender: tx.sender.clone(),
            });
        }
    }
    Ok(())
}

/// Validate one block given the balances of the chain prefix before it.
/// On success returns the balances after the block.
pub fn validate_block(
    prefix_state: &BalanceSheet,
    block: &Block,
    prev: Option<&Block>,
) -> Result<BalanceSheet, BlockRejection> {
    check_linkage(block, prev)?;
    check_seal(block)?;
    let mut next = prefix_state.clone();
    check_economics(&mut next, block)?;
    Ok(next)
}

/// Validate a whole chain from genesis with a running balance sheet.
///
/// Equivalent to validating `chain[i]` against `chain[i - 1]` under the
/// balances of `chain[..i]` for every `i`.
pub fn validate_chain(chain: &[Block]) -> Result<BalanceSheet, (usize, BlockRejection)> {
    if chain.is_empty() {
        return Err((0, BlockRejection::EmptyChain));
    }
    let mut state = BalanceSheet::new();
    for (i, block) in chain.iter().enumerate() {
        let prev = if i > 0 { chain.get(i - 1) } else { None };
        state = validate_block(&state, block, prev).map_err(|reason| (i, reason))?;
    }
    Ok(state)
}
