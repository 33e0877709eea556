use super::{constants::*, types::*};
use std::collections::TryReserveError;

/// Error type for tile store operations
#[derive(Debug)]
pub enum StoreError {
    AllocationFailed(TryReserveError),
}

impl From<TryReserveError> for StoreError {
    fn from(err: TryReserveError) -> Self {
        StoreError::AllocationFailed(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::AllocationFailed(e) => write!(f, "Allocation failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::AllocationFailed(e) => Some(e),
        }
    }
}

/// Bucket index for a tile position.
///
/// Coordinates are reinterpreted as u32 bit patterns before mixing, so every
/// shift is logical and negative coordinates hash the same on every target.
pub fn bucket_index(pos: TilePos) -> usize {
    let x = pos.x as u32;
    let y = pos.y as u32;
    let ux = x.wrapping_mul(HASH_X_MULTIPLIER);
    let uy = y.wrapping_mul(HASH_Y_MULTIPLIER);
    let raw = ux ^ (uy >> 16) ^ (uy << 13) ^ (x >> 5) ^ (y << 7);
    (raw % BUCKET_COUNT as u32) as usize
}

/// Fixed-bucket hash table mapping tile positions to colors.
///
/// Holds at most one record per position. The bucket count never changes.
#[derive(Debug, Clone)]
pub struct TileStore {
    /// One chain per bucket. The last element of a chain is its head
    /// (most recently inserted record).
    buckets: Box<[Vec<TileRecord>]>,
    len: usize,
}

impl TileStore {
    /// Create an empty store, reporting failure to allocate the bucket array
    pub fn try_new() -> Result<Self, StoreError> {
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(BUCKET_COUNT)?;
        buckets.resize_with(BUCKET_COUNT, Vec::new);
        Ok(Self {
            buckets: buckets.into_boxed_slice(),
            len: 0,
        })
    }

    /// Create an empty store
    pub fn new() -> Self {
        Self {
            buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    /// Insert or repaint a tile. Returns the previous color if the position
    /// was already painted.
    pub fn insert(
        &mut self,
        pos: TilePos,
        color: TileColor,
    ) -> Result<Option<TileColor>, StoreError> {
        let chain = &mut self.buckets[bucket_index(pos)];

        if let Some(record) = chain.iter_mut().find(|record| record.pos == pos) {
            return Ok(Some(std::mem::replace(&mut record.color, color)));
        }

        chain.try_reserve(1)?;
        chain.push(TileRecord::new(pos, color));
        self.len += 1;
        Ok(None)
    }

    /// Look up the record painted at a position
    pub fn get(&self, pos: TilePos) -> Option<TileRecord> {
        self.buckets[bucket_index(pos)]
            .iter()
            .rev()
            .find(|record| record.pos == pos)
            .copied()
    }

    /// Check if a position is painted
    pub fn contains(&self, pos: TilePos) -> bool {
        self.get(pos).is_some()
    }

    /// Remove the record at a position. Returns false if nothing was painted there.
    pub fn remove(&mut self, pos: TilePos) -> bool {
        let chain = &mut self.buckets[bucket_index(pos)];

        match chain.iter().rposition(|record| record.pos == pos) {
            Some(index) => {
                // Order-preserving so iteration stays head-to-tail
                chain.remove(index);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Release every record. The bucket array itself is kept.
    pub fn clear(&mut self) {
        for chain in self.buckets.iter_mut() {
            *chain = Vec::new();
        }
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate records in bucket order, then chain order (most recent first)
    pub fn iter(&self) -> impl Iterator<Item = &TileRecord> + '_ {
        self.buckets.iter().flat_map(|chain| chain.iter().rev())
    }

    /// Get statistics about bucket usage
    pub fn stats(&self) -> TileStoreStats {
        TileStoreStats {
            tiles: self.len,
            occupied_buckets: self.buckets.iter().filter(|chain| !chain.is_empty()).count(),
            longest_chain: self.buckets.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

impl Default for TileStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a tile store's buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileStoreStats {
    pub tiles: usize,
    pub occupied_buckets: usize,
    pub longest_chain: usize,
}

impl std::fmt::Display for TileStoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tiles: {}, Buckets used: {}/{}, Longest chain: {}",
            self.tiles, self.occupied_buckets, BUCKET_COUNT, self.longest_chain
        )
    }
}
