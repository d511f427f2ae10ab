//! An implementation of the Path ORAM protocol.
//!
//! A trusted [`Client`] stores logical blocks on an untrusted [`Server`] so
//! that the server observes an access pattern independent of the logical
//! access sequence. Every `store`, `retrieve`, or `delete` is realized as one
//! path read followed by one path write of the same shape, on a leaf chosen
//! uniformly at random and re-randomized on every access. Bucket contents are
//! AES-256-GCM ciphertexts; the key, the position map, and the stash never
//! leave client memory.
//!
//! # Example
//!
//! ```
//! use path_oram::{Client, OramConfig, Server};
//! use rand::rngs::OsRng;
//!
//! # fn main() -> Result<(), path_oram::OramError> {
//! let config = OramConfig {
//!     num_blocks: 14,
//!     blocks_per_bucket: 2,
//!     data_width: 16,
//!     ..OramConfig::default()
//! };
//! let mut server = Server::new(&config)?;
//! let mut client = Client::new(config, OsRng)?;
//! client.initialize_server_tree(&mut server)?;
//!
//! client.store(&mut server, 1, b"hello")?;
//! assert_eq!(client.retrieve(&mut server, 1)?, b"hello");
//! client.delete(&mut server, 1)?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

pub mod block;
pub mod cipher;
pub mod client;
mod error;
pub(crate) mod position_map;
pub mod server;
pub(crate) mod stash;
pub mod test_utils;

pub use block::{Block, Bucket, EncryptedBucket};
pub use client::Client;
pub use error::OramError;
pub use server::Server;

use crate::cipher::BlockCipher;

/// The numeric type of logical block identifiers.
pub type BlockId = u64;
/// The numeric type of leaf indices, in `[0, 2^L)` for a tree of height `L`.
pub type LeafIndex = u64;
/// The numeric type of tree heights and levels. The root is level 0 and the
/// leaves are level `L`.
pub type TreeHeight = u32;
/// The numeric type used to count blocks per bucket.
pub type BucketSize = usize;

/// The parameter `Z` from the Path ORAM literature that sets the number of
/// blocks per bucket; typical values are 3 or 4.
/// Here we adopt the more conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

// Keeps 2^(L+1) - 1 within range for level-order usize indexing.
const MAXIMUM_TREE_HEIGHT: TreeHeight = 62;

/// Configuration shared by a [`Client`] and the [`Server`] it drives.
#[derive(Clone, Debug)]
pub struct OramConfig {
    /// The logical capacity target `N`, in blocks.
    pub num_blocks: usize,
    /// The bucket capacity `Z`, in blocks.
    pub blocks_per_bucket: BucketSize,
    /// The fixed plaintext byte width `W` of each block's data.
    pub data_width: usize,
    /// High-water mark for the stash, in blocks. A stash left larger than
    /// this after an access surfaces [`OramError::StashOverflow`].
    pub max_stash_blocks: usize,
}

impl Default for OramConfig {
    fn default() -> Self {
        Self {
            num_blocks: 124,
            blocks_per_bucket: DEFAULT_BLOCKS_PER_BUCKET,
            data_width: 64,
            max_stash_blocks: 64,
        }
    }
}

impl OramConfig {
    /// Checks every field for plausibility.
    pub fn validate(&self) -> Result<(), OramError> {
        if self.num_blocks == 0 {
            return Err(OramError::InvalidConfiguration(
                "num_blocks must be positive".into(),
            ));
        }
        if self.blocks_per_bucket == 0 {
            return Err(OramError::InvalidConfiguration(
                "blocks_per_bucket must be positive".into(),
            ));
        }
        if self.data_width == 0 {
            return Err(OramError::InvalidConfiguration(
                "data_width must be positive".into(),
            ));
        }
        if self.max_stash_blocks == 0 {
            return Err(OramError::InvalidConfiguration(
                "max_stash_blocks must be positive".into(),
            ));
        }
        if self.tree_height() > MAXIMUM_TREE_HEIGHT {
            return Err(OramError::InvalidConfiguration(format!(
                "tree height {} exceeds the maximum of {}",
                self.tree_height(),
                MAXIMUM_TREE_HEIGHT
            )));
        }
        Ok(())
    }

    /// The tree height `L` derived from `N` and `Z`.
    ///
    /// The rule is `L = ceil(log2(ceil(N / Z) + 1)) - 1`, which guarantees
    /// that the tree's `Z * (2^(L+1) - 1)` slots can hold all `N` blocks.
    pub fn tree_height(&self) -> TreeHeight {
        let buckets_needed = (self.num_blocks + self.blocks_per_bucket - 1) / self.blocks_per_bucket;
        ceil_log2(buckets_needed as u64 + 1) - 1
    }

    /// The number of leaves, `2^L`.
    pub fn num_leaves(&self) -> u64 {
        1u64 << self.tree_height()
    }

    /// The number of buckets in the tree, `2^(L+1) - 1`.
    pub fn num_buckets(&self) -> usize {
        (1usize << (self.tree_height() + 1)) - 1
    }

    /// The byte length of every ciphertext crossing the client/server
    /// interface. Constant across real and dummy blocks.
    pub fn ciphertext_len(&self) -> usize {
        BlockCipher::ciphertext_len(Block::encoded_len(self.data_width))
    }
}

fn ceil_log2(value: u64) -> u32 {
    if value.is_power_of_two() {
        value.ilog2()
    } else {
        value.ilog2() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_height_rule() {
        let height = |num_blocks, blocks_per_bucket| {
            OramConfig {
                num_blocks,
                blocks_per_bucket,
                ..OramConfig::default()
            }
            .tree_height()
        };

        assert_eq!(height(14, 2), 2);
        assert_eq!(height(30, 2), 3);
        assert_eq!(height(124, 4), 4);
        // 15 blocks do not fit in the 7 buckets a height-2 tree provides.
        assert_eq!(height(15, 2), 3);
        assert_eq!(height(1, 4), 0);
    }

    #[test]
    fn tree_capacity_covers_num_blocks() {
        for num_blocks in 1..200 {
            for blocks_per_bucket in 1..6 {
                let config = OramConfig {
                    num_blocks,
                    blocks_per_bucket,
                    ..OramConfig::default()
                };
                assert!(
                    config.num_buckets() * blocks_per_bucket >= num_blocks,
                    "N = {num_blocks}, Z = {blocks_per_bucket}"
                );
            }
        }
    }

    #[test]
    fn rejects_zero_fields() {
        let bad = OramConfig {
            num_blocks: 0,
            ..OramConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(OramError::InvalidConfiguration(_))
        ));

        let bad = OramConfig {
            data_width: 0,
            ..OramConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(OramError::InvalidConfiguration(_))
        ));
    }
}
