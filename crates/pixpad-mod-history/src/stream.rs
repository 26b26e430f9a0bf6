/// Ordered, size-tracked chunk collections.
///
/// The head (front) is the most recent chunk. Alongside the total byte size,
/// a stream keeps its group nesting depth and the number of complete groups
/// up to date on every push and pop, so balance checks never scan.
use std::collections::VecDeque;

use crate::chunk::{Chunk, ChunkKind};

#[derive(Debug, Default)]
pub struct UndoStream {
    chunks: VecDeque<Chunk>,
    size: usize,
    /// OPEN chunks minus CLOSE chunks.
    depth: i64,
    /// Balanced runs of chunks (a chunk outside any group counts as one).
    complete_groups: usize,
}

impl UndoStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends `chunk` as the new head.
    pub fn push(&mut self, chunk: Chunk) {
        self.size += chunk.byte_size();
        self.depth += chunk.kind().nesting_delta();
        if self.depth == 0 {
            self.complete_groups += 1;
        }
        self.chunks.push_front(chunk);
    }

    /// Removes the most recent chunk.
    pub fn pop_head(&mut self) -> Option<Chunk> {
        let chunk = self.chunks.pop_front()?;
        if self.depth == 0 {
            self.complete_groups = self.complete_groups.saturating_sub(1);
        }
        self.depth -= chunk.kind().nesting_delta();
        self.size -= chunk.byte_size();
        Some(chunk)
    }

    /// Removes the oldest chunk.
    pub fn pop_tail(&mut self) -> Option<Chunk> {
        let chunk = self.chunks.pop_back()?;
        self.size -= chunk.byte_size();
        self.recount();
        Some(chunk)
    }

    /// Drops the oldest balanced group (or stray chunk) and returns how many
    /// chunks it held.
    pub fn discard_oldest_group(&mut self) -> usize {
        let mut level = 0i64;
        let mut discarded = 0;
        while let Some(chunk) = self.chunks.pop_back() {
            self.size -= chunk.byte_size();
            level += chunk.kind().nesting_delta();
            discarded += 1;
            if level == 0 {
                break;
            }
        }
        self.depth -= level;
        if discarded > 0 {
            self.complete_groups = self.complete_groups.saturating_sub(1);
        }
        discarded
    }

    fn recount(&mut self) {
        self.depth = 0;
        self.complete_groups = 0;
        for chunk in self.chunks.iter().rev() {
            self.depth += chunk.kind().nesting_delta();
            if self.depth == 0 {
                self.complete_groups += 1;
            }
        }
    }

    /// Releases all chunks.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.size = 0;
        self.depth = 0;
        self.complete_groups = 0;
    }

    pub fn head(&self) -> Option<&Chunk> {
        self.chunks.front()
    }

    /// Chunks from most recent to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of the byte sizes of all chunks.
    pub fn byte_size(&self) -> usize {
        self.size
    }

    /// Whether no group is left open.
    pub fn is_balanced(&self) -> bool {
        self.depth == 0
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    pub fn complete_groups(&self) -> usize {
        self.complete_groups
    }

    /// Number of chunks of `kind`.
    pub fn count_kind(&self, kind: ChunkKind) -> usize {
        self.chunks.iter().filter(|c| c.kind() == kind).count()
    }
}
