//! The client's transient block holding area.

use crate::BlockId;
use std::collections::BTreeMap;

/// Blocks absorbed from fetched paths and not yet evicted back into the
/// tree. Held only in client memory, never transmitted.
///
/// Backed by a `BTreeMap` so iteration is in ascending id order, making
/// eviction deterministic.
#[derive(Clone, Debug, Default)]
pub struct Stash {
    blocks: BTreeMap<BlockId, Vec<u8>>,
}

impl Stash {
    pub fn new() -> Self {
        Self::default()
    }

    /// The data held for `id`, if present.
    pub fn get(&self, id: BlockId) -> Option<&Vec<u8>> {
        self.blocks.get(&id)
    }

    /// Inserts `data` for `id`, overwriting any prior entry.
    pub fn put(&mut self, id: BlockId, data: Vec<u8>) {
        self.blocks.insert(id, data);
    }

    pub fn remove(&mut self, id: BlockId) -> Option<Vec<u8>> {
        self.blocks.remove(&id)
    }

    /// The held ids in ascending order.
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_sorted_by_id() {
        let mut stash = Stash::new();
        stash.put(9, b"nine".to_vec());
        stash.put(2, b"two".to_vec());
        stash.put(5, b"five".to_vec());
        assert_eq!(stash.ids(), vec![2, 5, 9]);
    }

    #[test]
    fn put_overwrites() {
        let mut stash = Stash::new();
        stash.put(1, b"old".to_vec());
        stash.put(1, b"new".to_vec());
        assert_eq!(stash.get(1).unwrap(), b"new");
        assert_eq!(stash.len(), 1);

        assert_eq!(stash.remove(1), Some(b"new".to_vec()));
        assert!(stash.is_empty());
    }
}
