//! The in-memory audit chain: genesis, guarded append, reads and verification.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::LedgerError;
use crate::index::BlockIndex;
use crate::model::{compute_block_hash, now_rfc3339, Block, BlockEntry};

/// Append-only chain of blocks plus its digest index.
///
/// Both structures live behind one lock so a reader never sees a block in
/// the chain that is missing from the index, or the other way round.
pub struct Ledger {
    inner: RwLock<LedgerState>,
}

struct LedgerState {
    chain: Vec<Block>,
    index: BlockIndex,
}

/// Result of a full-chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub ok: bool,
    pub length: usize,
    pub errors: Vec<String>,
}

impl Ledger {
    /// Create a ledger holding a freshly timestamped genesis block.
    pub fn new() -> Result<Self, LedgerError> {
        let timestamp = now_rfc3339().map_err(|e| LedgerError::Clock(e.to_string()))?;
        Ok(Self::with_genesis(Block::genesis(timestamp)))
    }

    /// Start a chain from `genesis`. The block is accepted as-is: there is
    /// no predecessor to check it against.
    pub fn with_genesis(genesis: Block) -> Self {
        tracing::info!(hash = %genesis.hash, "genesis block created");
        tracing::debug!(block = ?genesis, "genesis");

        let mut index = BlockIndex::new();
        index.put(genesis.hash.clone(), genesis.clone());
        Self {
            inner: RwLock::new(LedgerState {
                chain: vec![genesis],
                index,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Seal `entry` into a new block on top of the current tip.
    ///
    /// Reading the tip, building and validating the candidate, appending it
    /// and indexing it all happen under one write guard. A rejected
    /// candidate leaves both the chain and the index untouched.
    pub fn append(&self, entry: BlockEntry) -> Result<Block, LedgerError> {
        if entry.event.is_empty() {
            tracing::warn!("rejected block with empty event");
            return Err(LedgerError::EmptyEvent);
        }

        let mut state = self.write()?;
        let tip = state
            .chain
            .last()
            .ok_or_else(|| LedgerError::IntegrityViolation {
                index: 0,
                reason: "chain has no genesis block".into(),
            })?;

        let timestamp = now_rfc3339().map_err(|e| LedgerError::Clock(e.to_string()))?;
        let candidate = Block::seal(tip.index + 1, timestamp, entry, tip.hash.clone());

        if let Err(err) = check_link(&candidate, tip) {
            tracing::error!(error = %err, "candidate block failed validation");
            return Err(err);
        }

        state.index.put(candidate.hash.clone(), candidate.clone());
        state.chain.push(candidate.clone());

        tracing::info!(index = candidate.index, hash = %candidate.hash, "block appended");
        tracing::debug!(block = ?candidate, "appended");
        Ok(candidate)
    }

    /// Point-in-time copy of the whole chain, in order.
    pub fn snapshot(&self) -> Result<Vec<Block>, LedgerError> {
        Ok(self.read()?.chain.clone())
    }

    pub fn tip(&self) -> Result<Option<Block>, LedgerError> {
        Ok(self.read()?.chain.last().cloned())
    }

    /// Look up a block by digest. A miss is `None`, not an error.
    pub fn get(&self, digest: &str) -> Result<Option<Block>, LedgerError> {
        Ok(self.read()?.index.get(digest).cloned())
    }

    /// Whether the block stored under `digest` recorded exactly `event`.
    pub fn validate_event(&self, digest: &str, event: &str) -> Result<bool, LedgerError> {
        Ok(self.read()?.index.validate_event(digest, event))
    }

    /// Re-check every link and digest in the chain, and that the index
    /// holds one entry per block.
    pub fn verify(&self) -> Result<ChainReport, LedgerError> {
        let state = self.read()?;
        let mut errors = vec![];

        for (i, b) in state.chain.iter().enumerate() {
            if i == 0 {
                if b.index != 0 {
                    errors.push(format!("genesis index should be 0, found {}", b.index));
                }
                if !b.prev_hash.is_empty() {
                    errors.push("genesis prev_hash should be empty".to_string());
                }
                if compute_block_hash(b) != b.hash {
                    errors.push("block 0 hash mismatch".to_string());
                }
            } else if let Err(err) = check_link(b, &state.chain[i - 1]) {
                errors.push(err.to_string());
            }

            if state.index.get(&b.hash).is_none() {
                errors.push(format!("block {} missing from index", b.index));
            }
        }

        if state.index.len() != state.chain.len() {
            errors.push(format!(
                "index holds {} entries for {} blocks",
                state.index.len(),
                state.chain.len()
            ));
        }

        Ok(ChainReport {
            ok: errors.is_empty(),
            length: state.chain.len(),
            errors,
        })
    }
}

/// True iff `candidate` directly follows `predecessor` and its digest
/// recomputes from its own fields.
pub fn is_valid(candidate: &Block, predecessor: &Block) -> bool {
    check_link(candidate, predecessor).is_ok()
}

/// Like [`is_valid`], but reports which check failed.
pub fn check_link(candidate: &Block, predecessor: &Block) -> Result<(), LedgerError> {
    let violation = |reason: String| LedgerError::IntegrityViolation {
        index: candidate.index,
        reason,
    };

    if predecessor.index + 1 != candidate.index {
        return Err(violation(format!(
            "expected index {}, found {}",
            predecessor.index + 1,
            candidate.index
        )));
    }
    if predecessor.hash != candidate.prev_hash {
        return Err(violation("previous hash link mismatch".into()));
    }
    if compute_block_hash(candidate) != candidate.hash {
        return Err(violation("block hash mismatch".into()));
    }
    Ok(())
}
