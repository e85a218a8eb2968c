//! Process-scoped encryption context for incognito tab state.
//!
//! The key is generated once per browsing session, lives only in memory,
//! and is zeroized on drop. Generation runs on a background thread; the
//! first operation that needs the key blocks on the pending job.

use std::thread::JoinHandle;

use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_128_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use crate::types::errors::CryptoError;

/// AES-128-GCM key length in bytes.
pub const KEY_LENGTH: usize = 16;

/// AES-GCM nonce/IV length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

/// A nonce sequence that uses a single nonce value.
/// Used for one-shot encryption/decryption operations.
struct SingleNonce {
    nonce: Option<[u8; NONCE_LENGTH]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_LENGTH]) -> Self {
        Self {
            nonce: Some(nonce_bytes),
        }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.nonce
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// Session-lifetime incognito encryption context.
pub struct CryptoContext {
    key: Option<[u8; KEY_LENGTH]>,
    pending: Option<JoinHandle<[u8; KEY_LENGTH]>>,
    rng: SystemRandom,
}

impl CryptoContext {
    pub fn new() -> Self {
        Self {
            key: None,
            pending: None,
            rng: SystemRandom::new(),
        }
    }

    /// Kicks off key generation on a background thread if it has not
    /// happened yet. Safe to call any number of times.
    pub fn trigger_key_generation(&mut self) {
        if self.key.is_some() || self.pending.is_some() {
            return;
        }
        self.pending = Some(std::thread::spawn(|| {
            let rng = SystemRandom::new();
            let mut key = [0u8; KEY_LENGTH];
            rng.fill(&mut key).expect("Failed to generate incognito key");
            key
        }));
    }

    /// Returns the session key, blocking on a pending generation job.
    fn key_bytes(&mut self) -> [u8; KEY_LENGTH] {
        if self.key.is_none() {
            self.trigger_key_generation();
            let handle = self
                .pending
                .take()
                .expect("key generation was just triggered");
            let key = handle.join().expect("Incognito key generation failed");
            self.key = Some(key);
        }
        self.key.expect("key populated above")
    }

    /// Encrypts `plaintext` with the session key. Output layout:
    /// `nonce (12) || ciphertext || tag (16)`.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::RandomGeneration("Failed to generate nonce".to_string()))?;

        let unbound_key = UnboundKey::new(&AES_128_GCM, &self.key_bytes())
            .map_err(|_| CryptoError::Encryption("Failed to create encryption key".to_string()))?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Encryption("Encryption operation failed".to_string()))?;

        let mut output = nonce_bytes.to_vec();
        output.append(&mut in_out);
        Ok(output)
    }

    /// Decrypts data produced by [`encrypt`](Self::encrypt). A wrong key,
    /// tampered ciphertext, or short input all come back as `None` —
    /// callers treat every decrypt failure as "no valid state".
    pub fn decrypt(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        if data.len() < NONCE_LENGTH + TAG_LENGTH {
            return None;
        }
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        nonce_bytes.copy_from_slice(&data[..NONCE_LENGTH]);

        let unbound_key = match UnboundKey::new(&AES_128_GCM, &self.key_bytes()) {
            Ok(key) => key,
            Err(_) => {
                log::warn!("Failed to create decryption key");
                return None;
            }
        };
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut in_out = data[NONCE_LENGTH..].to_vec();
        match opening_key.open_in_place(Aad::empty(), &mut in_out) {
            Ok(plaintext) => Some(plaintext.to_vec()),
            Err(_) => None,
        }
    }
}

impl Default for CryptoContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CryptoContext {
    fn drop(&mut self) {
        if let Some(mut key) = self.key.take() {
            key.zeroize();
        }
    }
}
