//! Inclusive execution block ranges

use serde::{Deserialize, Serialize};
use shared_types::BlockNumber;
use std::fmt;

/// Inclusive block range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: BlockNumber,
    pub end: BlockNumber,
}

impl BlockRange {
    pub fn new(start: BlockNumber, end: BlockNumber) -> Self {
        Self { start, end }
    }

    /// Whether `end` lies past `start`, i.e. blocks were finalized since the
    /// checkpoint the range starts at.
    #[must_use]
    pub fn has_new_blocks(&self) -> bool {
        self.end > self.start
    }

    /// Whether `end` lies before `start`.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Number of blocks covered, zero for inverted ranges.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        if self.is_inverted() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Split into consecutive sub-ranges of at most `limit` blocks.
    pub fn chunks(&self, limit: u64) -> impl Iterator<Item = BlockRange> {
        let limit = limit.max(1);
        let end = self.end;
        let mut next = (!self.is_inverted()).then_some(self.start);

        std::iter::from_fn(move || {
            let start = next?;
            let chunk_end = start.saturating_add(limit - 1).min(end);
            next = (chunk_end < end).then(|| chunk_end + 1);
            Some(BlockRange::new(start, chunk_end))
        })
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
