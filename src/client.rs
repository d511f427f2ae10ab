//! The trusted Path ORAM client.
//!
//! Every public operation follows the same skeleton: remap the target id to a
//! fresh uniform leaf, fetch and decrypt the old path into the stash, apply
//! the operation against the stash, then rebuild and re-encrypt the same path
//! with as many stash blocks as the reachability constraints admit. The
//! server sees one path read and one path write per access, on a leaf that is
//! independent of the logical access sequence.

use crate::{
    block::{Block, Bucket, EncryptedBucket},
    cipher::{BlockCipher, EncryptionKey},
    position_map::PositionMap,
    server::Server,
    stash::Stash,
    BlockId, LeafIndex, OramConfig, OramError, TreeHeight, DEFAULT_BLOCKS_PER_BUCKET,
};
use rand::{CryptoRng, RngCore};
use std::ops::Range;

enum AccessKind<'a> {
    Store(&'a [u8]),
    Retrieve,
    Delete,
}

/// A Path ORAM client. Owns the encryption key, the position map, and the
/// stash; drives a [`Server`] through path reads and writes.
pub struct Client<R: RngCore + CryptoRng> {
    config: OramConfig,
    height: TreeHeight,
    cipher: BlockCipher,
    position_map: PositionMap,
    stash: Stash,
    rng: R,
}

impl<R: RngCore + CryptoRng> Client<R> {
    /// Creates a client for `config`, generating a fresh encryption key from
    /// `rng`. The key never leaves client memory.
    pub fn new(config: OramConfig, mut rng: R) -> Result<Self, OramError> {
        config.validate()?;
        let height = config.tree_height();
        log::debug!(
            "Client::new -- PathOram(N = {}, Z = {}, W = {}, L = {})",
            config.num_blocks,
            config.blocks_per_bucket,
            config.data_width,
            height
        );
        if config.blocks_per_bucket < DEFAULT_BLOCKS_PER_BUCKET {
            log::warn!(
                "Z = {} is below {}, the minimum assumed by the standard Path ORAM stash analysis",
                config.blocks_per_bucket,
                DEFAULT_BLOCKS_PER_BUCKET
            );
        }

        let key = EncryptionKey::random(&mut rng);
        let cipher = BlockCipher::new(&key);
        Ok(Self {
            config,
            height,
            cipher,
            position_map: PositionMap::new(),
            stash: Stash::new(),
            rng,
        })
    }

    /// Encrypts a full complement of all-dummy buckets and installs them on
    /// `server`. Must be called once before the first access.
    pub fn initialize_server_tree(&mut self, server: &mut Server) -> Result<(), OramError> {
        let num_buckets = self.config.num_buckets();
        let dummy = Bucket::dummy(self.config.blocks_per_bucket);
        let mut buckets = Vec::with_capacity(num_buckets);
        for _ in 0..num_buckets {
            buckets.push(self.encrypt_bucket(&dummy)?);
        }
        server.initialize_tree(buckets)
    }

    /// Stores `data` under `id`, overwriting any prior block with that id.
    ///
    /// Fails with [`OramError::Capacity`], before any server interaction, if
    /// `data` is longer than the configured width.
    pub fn store(&mut self, server: &mut Server, id: BlockId, data: &[u8]) -> Result<(), OramError> {
        if data.len() > self.config.data_width {
            return Err(OramError::Capacity {
                len: data.len(),
                width: self.config.data_width,
            });
        }
        if self.position_map.lookup(id).is_none() && self.position_map.len() >= self.config.num_blocks
        {
            log::warn!(
                "storing block {id} beyond the configured capacity of {} blocks",
                self.config.num_blocks
            );
        }
        log::info!("store -- block {id}");
        self.access(server, id, AccessKind::Store(data))?;
        Ok(())
    }

    /// Retrieves the data stored under `id`.
    ///
    /// Fails with [`OramError::NotFound`], without any server interaction, if
    /// `id` has never been stored or has been deleted.
    pub fn retrieve(&mut self, server: &mut Server, id: BlockId) -> Result<Vec<u8>, OramError> {
        log::info!("retrieve -- block {id}");
        let out = self.access(server, id, AccessKind::Retrieve)?;
        out.ok_or(OramError::Integrity { id })
    }

    /// Deletes the block stored under `id`.
    ///
    /// Fails with [`OramError::NotFound`], without any server interaction, if
    /// `id` has never been stored or has already been deleted.
    pub fn delete(&mut self, server: &mut Server, id: BlockId) -> Result<(), OramError> {
        log::info!("delete -- block {id}");
        self.access(server, id, AccessKind::Delete)?;
        Ok(())
    }

    /// The tree height `L`.
    pub fn tree_height(&self) -> TreeHeight {
        self.height
    }

    /// The number of blocks currently held in the stash.
    pub fn stash_len(&self) -> usize {
        self.stash.len()
    }

    /// The ids currently held in the stash, in ascending order.
    pub fn stash_ids(&self) -> Vec<BlockId> {
        self.stash.ids()
    }

    /// One composite access: remap, fetch-and-absorb, apply `op`, rebuild,
    /// write back.
    ///
    /// The touched position map entry and the stash are snapshotted first; if
    /// anything fails before `set_path` succeeds, both are restored, so a
    /// failed access leaves client state consistent with the unwritten server
    /// tree. The commit point is the `set_path` return.
    fn access(
        &mut self,
        server: &mut Server,
        id: BlockId,
        op: AccessKind<'_>,
    ) -> Result<Option<Vec<u8>>, OramError> {
        let prior_position = self.position_map.lookup(id);
        let old_leaf = match prior_position {
            Some(leaf) => leaf,
            // A store to an unknown id fetches a uniformly chosen placeholder
            // path; it holds no copy of the block, so absorption is a no-op.
            None => match op {
                AccessKind::Store(_) => self.random_leaf(),
                AccessKind::Retrieve | AccessKind::Delete => {
                    return Err(OramError::NotFound { id })
                }
            },
        };
        let stash_snapshot = self.stash.clone();

        let result = self.access_inner(server, id, op, old_leaf);
        if result.is_err() {
            self.stash = stash_snapshot;
            match prior_position {
                Some(leaf) => self.position_map.assign(id, leaf),
                None => {
                    self.position_map.remove(id);
                }
            }
        }
        result
    }

    fn access_inner(
        &mut self,
        server: &mut Server,
        id: BlockId,
        op: AccessKind<'_>,
        old_leaf: LeafIndex,
    ) -> Result<Option<Vec<u8>>, OramError> {
        // Remap before the path is rebuilt: eviction must use the new
        // position, and the new path may only hold this block on its shared
        // prefix with the old one.
        let new_leaf = self.random_leaf();
        self.position_map.assign(id, new_leaf);
        log::debug!("block {id} remapped to leaf {new_leaf}");

        self.read_path_into_stash(server, old_leaf)?;

        let out = match op {
            AccessKind::Store(data) => {
                self.stash.put(id, data.to_vec());
                None
            }
            AccessKind::Retrieve => {
                // The fetched path must have surfaced the block (or a prior
                // access left it stashed).
                let data = self
                    .stash
                    .get(id)
                    .cloned()
                    .ok_or(OramError::Integrity { id })?;
                Some(data)
            }
            AccessKind::Delete => {
                self.stash.remove(id);
                self.position_map.remove(id);
                None
            }
        };

        let path = self.build_new_path(old_leaf)?;
        if self.stash.len() > self.config.max_stash_blocks {
            return Err(OramError::StashOverflow {
                len: self.stash.len(),
                limit: self.config.max_stash_blocks,
            });
        }
        server.set_path(path, old_leaf)?;
        Ok(out)
    }

    /// Fetches Path(`leaf`), decrypts every slot, and absorbs the real blocks
    /// into the stash. Same-id overwrite is a no-op: no real id occupies two
    /// slots across the stash and the tree.
    fn read_path_into_stash(
        &mut self,
        server: &mut Server,
        leaf: LeafIndex,
    ) -> Result<(), OramError> {
        let path = server.get_path(leaf)?;
        for encrypted in &path {
            let bucket = self.decrypt_bucket(encrypted)?;
            for block in bucket.blocks {
                if let Block::Real { id, data } = block {
                    self.stash.put(id, data);
                }
            }
        }
        log::debug!("stash holds {} blocks after absorbing path", self.stash.len());
        Ok(())
    }

    /// Rebuilds Path(`leaf`) from the stash, root first.
    ///
    /// Levels are filled from the leaf toward the root so that each block
    /// lands as deep as the shared prefix between its newly assigned leaf and
    /// `leaf` permits; the root admits every remaining block. Stash entries
    /// are considered in ascending id order, and each placed block leaves the
    /// stash. Remaining slots become freshly encrypted dummies.
    fn build_new_path(&mut self, leaf: LeafIndex) -> Result<Vec<EncryptedBucket>, OramError> {
        let blocks_per_bucket = self.config.blocks_per_bucket;
        let mut path = vec![EncryptedBucket { slots: Vec::new() }; self.height as usize + 1];

        for level in (0..=self.height).rev() {
            let reach = self.reachable_leaves(leaf, level);
            let mut bucket = Bucket {
                blocks: Vec::with_capacity(blocks_per_bucket),
            };
            for id in self.stash.ids() {
                if bucket.blocks.len() == blocks_per_bucket {
                    break;
                }
                match self.position_map.lookup(id) {
                    Some(position) if reach.contains(&position) => {
                        if let Some(data) = self.stash.remove(id) {
                            bucket.blocks.push(Block::Real { id, data });
                        }
                    }
                    _ => {}
                }
            }
            while bucket.blocks.len() < blocks_per_bucket {
                bucket.blocks.push(Block::Dummy);
            }
            path[level as usize] = self.encrypt_bucket(&bucket)?;
        }
        Ok(path)
    }

    /// The leaves whose root-to-leaf paths pass through the level-`level`
    /// node on the path to `leaf`: the aligned span of `2^(L - level)` leaves
    /// containing `leaf`.
    fn reachable_leaves(&self, leaf: LeafIndex, level: TreeHeight) -> Range<LeafIndex> {
        let span = 1u64 << (self.height - level);
        let base = leaf & !(span - 1);
        base..base + span
    }

    fn random_leaf(&mut self) -> LeafIndex {
        // The leaf count is a power of two, so masking the draw is unbiased.
        self.rng.next_u64() & (self.num_leaves() - 1)
    }

    fn num_leaves(&self) -> u64 {
        1u64 << self.height
    }

    fn decrypt_bucket(&self, encrypted: &EncryptedBucket) -> Result<Bucket, OramError> {
        let mut blocks = Vec::with_capacity(encrypted.slots.len());
        for slot in &encrypted.slots {
            let plaintext = self.cipher.decrypt(slot)?;
            blocks.push(Block::decode(&plaintext, self.config.data_width)?);
        }
        Ok(Bucket { blocks })
    }

    fn encrypt_bucket(&mut self, bucket: &Bucket) -> Result<EncryptedBucket, OramError> {
        let mut slots = Vec::with_capacity(bucket.blocks.len());
        for block in &bucket.blocks {
            let plaintext = block.encode(self.config.data_width)?;
            slots.push(self.cipher.encrypt(&plaintext, &mut self.rng)?);
        }
        Ok(EncryptedBucket { slots })
    }
}
