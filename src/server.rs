//! The untrusted server's bucket store.
//!
//! The store is a complete binary tree of height `L` held as a flat array in
//! level order: the root is index 0 and node `i` has children `2i + 1` and
//! `2i + 2`. The server moves opaque ciphertext buckets along root-to-leaf
//! paths and never interprets them.

use crate::{block::EncryptedBucket, LeafIndex, OramConfig, OramError, TreeHeight};

/// An in-memory bucket store exposing path reads and writes keyed by leaf
/// index.
#[derive(Debug)]
pub struct Server {
    /// The tree's buckets in level order. Empty until
    /// [`Server::initialize_tree`] installs the initial contents.
    tree: Vec<EncryptedBucket>,
    height: TreeHeight,
    blocks_per_bucket: usize,
    ciphertext_len: usize,
    /// `reads[i]` counts path reads that touched node `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` counts path writes that touched node `i`.
    pub writes: Vec<u64>,
}

impl Server {
    /// Creates an uninitialized store sized for `config`.
    pub fn new(config: &OramConfig) -> Result<Self, OramError> {
        config.validate()?;
        let num_buckets = config.num_buckets();
        Ok(Self {
            tree: Vec::new(),
            height: config.tree_height(),
            blocks_per_bucket: config.blocks_per_bucket,
            ciphertext_len: config.ciphertext_len(),
            reads: vec![0; num_buckets],
            writes: vec![0; num_buckets],
        })
    }

    /// The number of leaves, `2^L`.
    pub fn num_leaves(&self) -> u64 {
        1u64 << self.height
    }

    /// The number of buckets in the tree, `2^(L+1) - 1`.
    pub fn num_buckets(&self) -> usize {
        (1usize << (self.height + 1)) - 1
    }

    /// Installs the tree contents, in level order from the root.
    ///
    /// Fails with [`OramError::Shape`] if the bucket count or any bucket's
    /// dimensions are wrong.
    pub fn initialize_tree(&mut self, buckets: Vec<EncryptedBucket>) -> Result<(), OramError> {
        if buckets.len() != self.num_buckets() {
            return Err(OramError::Shape(format!(
                "tree of {} buckets, expected {}",
                buckets.len(),
                self.num_buckets()
            )));
        }
        for bucket in &buckets {
            bucket.check_shape(self.blocks_per_bucket, self.ciphertext_len)?;
        }
        log::debug!("initialize_tree -- {} buckets installed", buckets.len());
        self.tree = buckets;
        Ok(())
    }

    /// Returns the `L + 1` buckets on the path from the root to `leaf`, root
    /// first.
    ///
    /// The path is determined by the binary representation of `leaf`: bit `k`
    /// (for `k = L - 1` down to `0`) selects the right child when set and the
    /// left child when clear.
    ///
    /// Fails with [`OramError::Range`] if `leaf` is out of bounds for the
    /// tree height.
    pub fn get_path(&mut self, leaf: LeafIndex) -> Result<Vec<EncryptedBucket>, OramError> {
        let indices = self.path_indices(leaf)?;
        log::debug!("get_path -- leaf {leaf}");

        let mut path = Vec::with_capacity(indices.len());
        for index in indices {
            self.reads[index] += 1;
            path.push(self.tree[index].clone());
        }
        Ok(path)
    }

    /// Overwrites the `L + 1` buckets on the path from the root to `leaf`
    /// with `path`, root first.
    ///
    /// Fails with [`OramError::Range`] if `leaf` is out of bounds and with
    /// [`OramError::Shape`] if `path` has the wrong length or any bucket has
    /// the wrong dimensions. There is no blind-write authorization check: the
    /// client is the trust root, and authenticity is delegated to the AEAD
    /// layer on bucket contents.
    pub fn set_path(
        &mut self,
        path: Vec<EncryptedBucket>,
        leaf: LeafIndex,
    ) -> Result<(), OramError> {
        let indices = self.path_indices(leaf)?;
        if path.len() != indices.len() {
            return Err(OramError::Shape(format!(
                "path of {} buckets, expected {}",
                path.len(),
                indices.len()
            )));
        }
        for bucket in &path {
            bucket.check_shape(self.blocks_per_bucket, self.ciphertext_len)?;
        }
        log::debug!("set_path -- leaf {leaf}");

        for (index, bucket) in indices.into_iter().zip(path) {
            self.writes[index] += 1;
            self.tree[index] = bucket;
        }
        Ok(())
    }

    /// The total number of bucket reads served.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// The total number of bucket writes served.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }

    /// Iterates over every bucket currently installed, in level order.
    pub fn buckets(&self) -> impl Iterator<Item = &EncryptedBucket> {
        self.tree.iter()
    }

    /// Renders the tree level by level, one line per level, each bucket shown
    /// as the hex digest of its first slot's leading bytes. Diagnostic only.
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        for level in 0..=self.height {
            let first = (1usize << level) - 1;
            let last = (1usize << (level + 1)) - 1;
            out.push_str(&format!("Level {level}:"));
            for node in first..last.min(self.tree.len()) {
                let digest: String = self.tree[node].slots[0]
                    .iter()
                    .take(4)
                    .map(|byte| format!("{byte:02x}"))
                    .collect();
                out.push_str(&format!(" [{digest}]"));
            }
            out.push('\n');
        }
        out
    }

    fn path_indices(&self, leaf: LeafIndex) -> Result<Vec<usize>, OramError> {
        if leaf >= self.num_leaves() {
            return Err(OramError::Range {
                leaf,
                num_leaves: self.num_leaves(),
            });
        }
        if self.tree.is_empty() {
            return Err(OramError::Shape("tree has not been initialized".into()));
        }

        let mut indices = Vec::with_capacity(self.height as usize + 1);
        let mut node = 0usize;
        indices.push(node);
        for level in (0..self.height).rev() {
            let bit = ((leaf >> level) & 1) as usize;
            node = 2 * node + 1 + bit;
            indices.push(node);
        }
        Ok(indices)
    }

    #[cfg(test)]
    pub(crate) fn bucket_mut(&mut self, index: usize) -> &mut EncryptedBucket {
        &mut self.tree[index]
    }
}
