//! Errors for Path ORAM operations.

use crate::{BlockId, LeafIndex};
use thiserror::Error;

/// The error type of every fallible operation in this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OramError {
    /// Retrieve or delete of an id with no position map entry. Recoverable;
    /// returned before any server interaction.
    #[error("block {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: BlockId,
    },
    /// A leaf index outside `[0, 2^L)` crossed the client/server interface.
    #[error("leaf index {leaf} is out of bounds for a tree with {num_leaves} leaves")]
    Range {
        /// The offending leaf index.
        leaf: LeafIndex,
        /// The number of leaves in the tree.
        num_leaves: u64,
    },
    /// A bucket or path of the wrong dimensions crossed the interface.
    #[error("shape mismatch: {0}")]
    Shape(String),
    /// AEAD authentication or decryption failed. Fatal to the access; a
    /// client session that sees this should be abandoned, since it suggests
    /// server tampering.
    #[error("ciphertext failed to authenticate")]
    Crypto,
    /// Block data longer than the configured width. Rejected before any
    /// server call.
    #[error("block data of {len} bytes exceeds the configured width of {width}")]
    Capacity {
        /// The rejected data length.
        len: usize,
        /// The configured plaintext width.
        width: usize,
    },
    /// The stash exceeded its configured high-water mark, signaling that the
    /// `Z`, `L`, or access pattern assumptions were violated.
    #[error("stash holds {len} blocks, above the high-water mark of {limit}")]
    StashOverflow {
        /// The stash occupancy that tripped the check.
        len: usize,
        /// The configured high-water mark.
        limit: usize,
    },
    /// A block the position map promised was neither in the stash nor on its
    /// assigned path. Indicates a bug or tampering.
    #[error("block {id} missing from stash after path absorption")]
    Integrity {
        /// The id that should have been present.
        id: BlockId,
    },
    /// A configuration field failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
