//! Digest-to-block lookup backing fetch and third-party validation.

use std::collections::HashMap;

use crate::model::Block;

/// Maps a block digest to the block itself. Last writer wins on a duplicate
/// key; with SHA-256 digests that is not expected to happen.
#[derive(Debug, Default)]
pub struct BlockIndex {
    by_hash: HashMap<String, Block>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, digest: String, block: Block) {
        self.by_hash.insert(digest, block);
    }

    pub fn get(&self, digest: &str) -> Option<&Block> {
        self.by_hash.get(digest)
    }

    /// True iff a block is stored under `digest` and its event is exactly
    /// `event`. Unknown digests are simply false.
    pub fn validate_event(&self, digest: &str, event: &str) -> bool {
        self.by_hash
            .get(digest)
            .is_some_and(|block| block.event == event)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}
