//! Block and bucket structures for Path ORAM, and the canonical byte codec.
//!
//! Every block, real or dummy, encodes to the same `tag || id || data_len ||
//! padded data` layout of `13 + W` bytes, so every ciphertext on the wire has
//! the same length and bucket size stays constant.

use crate::{BlockId, BucketSize, OramError};

const DUMMY_TAG: u8 = 0;
const REAL_TAG: u8 = 1;

// tag (1) || id (8, LE) || data_len (4, LE)
const BLOCK_HEADER_LEN: usize = 13;

/// The plaintext unit of storage.
///
/// The dedicated `Dummy` variant plays the role of an in-band sentinel id:
/// no real id can collide with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// A live record.
    Real {
        /// The logical block id.
        id: BlockId,
        /// The block payload, at most the configured width `W`.
        data: Vec<u8>,
    },
    /// A placeholder occupying a bucket slot so bucket size is constant on
    /// the wire.
    Dummy,
}

impl Block {
    /// Whether this block is a [`Block::Dummy`].
    pub fn is_dummy(&self) -> bool {
        matches!(self, Block::Dummy)
    }

    /// The id of a real block, or `None` for a dummy.
    pub fn id(&self) -> Option<BlockId> {
        match self {
            Block::Real { id, .. } => Some(*id),
            Block::Dummy => None,
        }
    }

    /// The encoded length of any block under data width `width`.
    pub const fn encoded_len(width: usize) -> usize {
        BLOCK_HEADER_LEN + width
    }

    /// Encodes this block into its canonical fixed-width form.
    pub fn encode(&self, width: usize) -> Result<Vec<u8>, OramError> {
        let mut out = vec![0u8; Self::encoded_len(width)];
        match self {
            Block::Dummy => {}
            Block::Real { id, data } => {
                if data.len() > width {
                    return Err(OramError::Capacity {
                        len: data.len(),
                        width,
                    });
                }
                out[0] = REAL_TAG;
                out[1..9].copy_from_slice(&id.to_le_bytes());
                out[9..13].copy_from_slice(&(data.len() as u32).to_le_bytes());
                out[13..13 + data.len()].copy_from_slice(data);
            }
        }
        Ok(out)
    }

    /// Decodes a canonical fixed-width form back into a block.
    pub fn decode(bytes: &[u8], width: usize) -> Result<Self, OramError> {
        if bytes.len() != Self::encoded_len(width) {
            return Err(OramError::Shape(format!(
                "block record of {} bytes, expected {}",
                bytes.len(),
                Self::encoded_len(width)
            )));
        }
        match bytes[0] {
            DUMMY_TAG => Ok(Block::Dummy),
            REAL_TAG => {
                let id = BlockId::from_le_bytes(bytes[1..9].try_into().unwrap());
                let data_len = u32::from_le_bytes(bytes[9..13].try_into().unwrap()) as usize;
                if data_len > width {
                    return Err(OramError::Shape(format!(
                        "data length {data_len} exceeds the configured width {width}"
                    )));
                }
                Ok(Block::Real {
                    id,
                    data: bytes[13..13 + data_len].to_vec(),
                })
            }
            other => Err(OramError::Shape(format!("unknown block tag {other}"))),
        }
    }
}

/// A plaintext Path ORAM bucket of exactly `Z` blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// The blocks stored by this bucket.
    pub blocks: Vec<Block>,
}

impl Bucket {
    /// A bucket of `blocks_per_bucket` dummies.
    pub fn dummy(blocks_per_bucket: BucketSize) -> Self {
        Self {
            blocks: vec![Block::Dummy; blocks_per_bucket],
        }
    }
}

/// The wire form of a bucket: exactly `Z` AEAD ciphertexts of equal length.
///
/// The server stores and moves these without interpreting them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedBucket {
    /// One ciphertext per bucket slot.
    pub slots: Vec<Vec<u8>>,
}

impl EncryptedBucket {
    /// Validates that this bucket has `blocks_per_bucket` slots of
    /// `ciphertext_len` bytes each.
    pub fn check_shape(
        &self,
        blocks_per_bucket: BucketSize,
        ciphertext_len: usize,
    ) -> Result<(), OramError> {
        if self.slots.len() != blocks_per_bucket {
            return Err(OramError::Shape(format!(
                "bucket of {} slots, expected {blocks_per_bucket}",
                self.slots.len()
            )));
        }
        for slot in &self.slots {
            if slot.len() != ciphertext_len {
                return Err(OramError::Shape(format!(
                    "ciphertext of {} bytes, expected {ciphertext_len}",
                    slot.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: usize = 16;

    #[test]
    fn codec_round_trip() {
        let block = Block::Real {
            id: 7,
            data: b"abcd".to_vec(),
        };
        let encoded = block.encode(WIDTH).unwrap();
        assert_eq!(encoded.len(), Block::encoded_len(WIDTH));
        assert_eq!(Block::decode(&encoded, WIDTH).unwrap(), block);
    }

    #[test]
    fn dummy_round_trip() {
        let encoded = Block::Dummy.encode(WIDTH).unwrap();
        assert_eq!(encoded.len(), Block::encoded_len(WIDTH));
        assert_eq!(Block::decode(&encoded, WIDTH).unwrap(), Block::Dummy);
    }

    #[test]
    fn encoding_is_length_stable() {
        let empty = Block::Real {
            id: 0,
            data: Vec::new(),
        };
        let full = Block::Real {
            id: BlockId::MAX,
            data: vec![0xAB; WIDTH],
        };
        let lengths = [
            empty.encode(WIDTH).unwrap().len(),
            full.encode(WIDTH).unwrap().len(),
            Block::Dummy.encode(WIDTH).unwrap().len(),
        ];
        assert!(lengths.iter().all(|&len| len == Block::encoded_len(WIDTH)));
    }

    #[test]
    fn oversized_data_is_rejected() {
        let block = Block::Real {
            id: 1,
            data: vec![0; WIDTH + 1],
        };
        assert!(matches!(
            block.encode(WIDTH),
            Err(OramError::Capacity { len, width }) if len == WIDTH + 1 && width == WIDTH
        ));
    }

    #[test]
    fn decode_rejects_malformed_input() {
        // Wrong length.
        assert!(matches!(
            Block::decode(&[0u8; 5], WIDTH),
            Err(OramError::Shape(_))
        ));

        // Unknown tag.
        let mut encoded = Block::Dummy.encode(WIDTH).unwrap();
        encoded[0] = 9;
        assert!(matches!(
            Block::decode(&encoded, WIDTH),
            Err(OramError::Shape(_))
        ));

        // Declared data length past the fixed width.
        let mut encoded = Block::Real {
            id: 1,
            data: b"x".to_vec(),
        }
        .encode(WIDTH)
        .unwrap();
        encoded[9..13].copy_from_slice(&(WIDTH as u32 + 1).to_le_bytes());
        assert!(matches!(
            Block::decode(&encoded, WIDTH),
            Err(OramError::Shape(_))
        ));
    }

    #[test]
    fn bucket_shape_check() {
        let good = EncryptedBucket {
            slots: vec![vec![0u8; 45]; 2],
        };
        assert!(good.check_shape(2, 45).is_ok());
        assert!(matches!(good.check_shape(3, 45), Err(OramError::Shape(_))));
        assert!(matches!(good.check_shape(2, 44), Err(OramError::Shape(_))));
    }
}
