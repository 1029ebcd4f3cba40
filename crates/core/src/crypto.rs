//! Sealed-blob encryption: AES-256-GCM with random nonces.
//!
//! Sealed blob format:
//!
//! ```text
//! [12-byte nonce][ciphertext + 16-byte tag]
//! ```
//!
//! Every stored ciphertext uses this layout, whether it holds a whole
//! single-shot upload or one chunk of a larger file. The nonce is drawn
//! fresh for every seal; nothing in the blob identifies the file or key
//! it belongs to.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Key length in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Nonce length in bytes (GCM standard).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// A per-file encryption key. Zeroized on drop.
///
/// Generated once per completed upload and returned to the client exactly
/// once; the server keeps no copy. `Debug` redacts the bytes so
/// instrumented code paths cannot leak them into logs.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Generate a random 256-bit key.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Decode a key from its hex form.
    ///
    /// Only the encoding is validated here; a decoded key of the wrong
    /// length is rejected by [`open`] as a decryption failure, so callers
    /// cannot probe for key-length hints.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded).map_err(|e| Error::KeyEncoding(e.to_string()))?;
        Ok(Self { bytes })
    }

    /// Hex encoding of the raw key bytes, as shared with the client.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate an opaque identifier: hex of 16 random bytes.
///
/// Used for server-assigned file ids. Ids are not checked for collision
/// against the store; at 128 random bits a duplicate surfaces as a
/// primary-key conflict, never as silent corruption.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Encrypt a plaintext under `key` with a fresh random nonce.
///
/// Output: `[12-byte nonce][ciphertext + 16-byte tag]`
pub fn seal(plaintext: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| Error::Encryption)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| Error::Encryption)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a sealed blob (output of [`seal`]).
///
/// Fails with [`Error::Decryption`] on a truncated blob, a tampered
/// ciphertext or tag, or an unusable key; the error is uniform across
/// causes and no partial plaintext is ever returned.
pub fn open(sealed: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Decryption);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| Error::Decryption)?;

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.decrypt(nonce, ciphertext).map_err(|_| Error::Decryption)
}
