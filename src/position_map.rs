//! The client's id-to-leaf table.

use crate::{BlockId, LeafIndex};
use std::collections::HashMap;

/// Maps each stored block id to its currently assigned leaf. Plaintext, held
/// only in client memory.
#[derive(Clone, Debug, Default)]
pub struct PositionMap {
    positions: HashMap<BlockId, LeafIndex>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The leaf currently assigned to `id`, if any.
    pub fn lookup(&self, id: BlockId) -> Option<LeafIndex> {
        self.positions.get(&id).copied()
    }

    pub fn assign(&mut self, id: BlockId, leaf: LeafIndex) {
        self.positions.insert(id, leaf);
    }

    pub fn remove(&mut self, id: BlockId) -> Option<LeafIndex> {
        self.positions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, LeafIndex)> + '_ {
        self.positions.iter().map(|(&id, &leaf)| (id, leaf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_overwrites() {
        let mut map = PositionMap::new();
        assert_eq!(map.lookup(1), None);

        map.assign(1, 3);
        map.assign(1, 0);
        assert_eq!(map.lookup(1), Some(0));
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove(1), Some(0));
        assert!(map.is_empty());
        assert_eq!(map.remove(1), None);
    }
}
