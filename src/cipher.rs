//! Authenticated encryption of block records.
//!
//! Every record on the wire is `nonce (12 bytes) || ciphertext || tag (16
//! bytes)` under AES-256-GCM. The nonce is drawn fresh from the caller's RNG
//! on every encryption, so identical plaintexts produce distinct ciphertexts.

use crate::OramError;
use aes_gcm::{aead::Aead, Aes256Gcm, Key, KeyInit, Nonce};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// An AES-256 key held only in client memory, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Draws a fresh key from `rng`.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts and decrypts individual block records.
pub struct BlockCipher {
    cipher: Aes256Gcm,
}

impl BlockCipher {
    /// Builds a cipher from `key`.
    pub fn new(key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypts `plaintext` under a nonce drawn fresh from `rng`, returning
    /// `nonce || ciphertext || tag`.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| OramError::Crypto)?;

        let mut record = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        record.extend_from_slice(&nonce_bytes);
        record.extend_from_slice(&ciphertext);
        Ok(record)
    }

    /// Decrypts a `nonce || ciphertext || tag` record, failing with
    /// [`OramError::Crypto`] on tag mismatch or malformed input.
    pub fn decrypt(&self, record: &[u8]) -> Result<Vec<u8>, OramError> {
        if record.len() < NONCE_SIZE + TAG_SIZE {
            return Err(OramError::Crypto);
        }
        let (nonce_bytes, body) = record.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher.decrypt(nonce, body).map_err(|_| OramError::Crypto)
    }

    /// The record length produced for a plaintext of `plaintext_len` bytes.
    pub const fn ciphertext_len(plaintext_len: usize) -> usize {
        NONCE_SIZE + plaintext_len + TAG_SIZE
    }
}

impl std::fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OramError;
    use rand::{rngs::StdRng, SeedableRng};

    fn test_cipher(rng: &mut StdRng) -> BlockCipher {
        let key = EncryptionKey::random(rng);
        BlockCipher::new(&key)
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        let cipher = test_cipher(&mut rng);

        let plaintext = b"seventeen bytes!!".to_vec();
        let record = cipher.encrypt(&plaintext, &mut rng).unwrap();
        assert_eq!(record.len(), BlockCipher::ciphertext_len(plaintext.len()));
        assert_eq!(cipher.decrypt(&record).unwrap(), plaintext);
    }

    #[test]
    fn fresh_nonces_give_distinct_ciphertexts() {
        let mut rng = StdRng::seed_from_u64(0);
        let cipher = test_cipher(&mut rng);

        let first = cipher.encrypt(b"same plaintext", &mut rng).unwrap();
        let second = cipher.encrypt(b"same plaintext", &mut rng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn bit_flip_fails_authentication() {
        let mut rng = StdRng::seed_from_u64(0);
        let cipher = test_cipher(&mut rng);

        let mut record = cipher.encrypt(b"payload", &mut rng).unwrap();
        for position in 0..record.len() {
            record[position] ^= 1;
            assert!(matches!(cipher.decrypt(&record), Err(OramError::Crypto)));
            record[position] ^= 1;
        }
        // Undisturbed, the record still authenticates.
        assert!(cipher.decrypt(&record).is_ok());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let cipher = test_cipher(&mut rng);

        assert!(matches!(cipher.decrypt(b""), Err(OramError::Crypto)));
        assert!(matches!(
            cipher.decrypt(&[0u8; NONCE_SIZE + TAG_SIZE - 1]),
            Err(OramError::Crypto)
        ));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let mut rng = StdRng::seed_from_u64(0);
        let cipher = test_cipher(&mut rng);
        let other = test_cipher(&mut rng);

        let record = cipher.encrypt(b"payload", &mut rng).unwrap();
        assert!(matches!(other.decrypt(&record), Err(OramError::Crypto)));
    }
}
