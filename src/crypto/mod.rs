//! AES payload decryption
//!
//! Audio payload bodies are AES-128-CBC encrypted. The content key is not
//! shipped in the clear: it is recovered once per session from the session's
//! key-message blob by an opaque unwrap transform, then combined with the
//! pairing shared secret to derive the CBC key. The IV is reset for every
//! packet; the trailing partial block of a payload is never encrypted and
//! passes through untouched.

use std::sync::Arc;

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use sha2::{Digest, Sha512};

use crate::session::StreamSession;

/// AES block size in bytes
const BLOCK_SIZE: usize = 16;

/// Errors from payload decryption and key recovery
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Session record lacks the material needed to recover the content key
    #[error("missing key material")]
    MissingKeyMaterial,

    /// The key-unwrap transform rejected the session material
    #[error("key unwrap failed: {0}")]
    KeyUnwrap(String),
}

/// Opaque content-key unwrap transform.
///
/// The source device wraps the 16-byte content key with its own routine;
/// which transform applies is decided when the collaborator wires up the
/// session store, so the core only sees this capability.
pub trait KeyRecovery: Send + Sync {
    /// Recover the plaintext 16-byte content key from the session's
    /// key-message blob and encrypted key.
    ///
    /// # Errors
    /// Returns `CryptoError` if the material is absent or malformed.
    fn unwrap_key(
        &self,
        key_message: &[u8],
        encrypted_key: &[u8],
    ) -> Result<[u8; 16], CryptoError>;
}

/// Key recovery for sessions negotiated without content protection:
/// the leading 16 bytes of the key field are the key.
#[derive(Debug, Default)]
pub struct DirectKeyRecovery;

impl KeyRecovery for DirectKeyRecovery {
    fn unwrap_key(
        &self,
        _key_message: &[u8],
        encrypted_key: &[u8],
    ) -> Result<[u8; 16], CryptoError> {
        let head = encrypted_key
            .get(..16)
            .ok_or(CryptoError::MissingKeyMaterial)?;
        let mut key = [0u8; 16];
        key.copy_from_slice(head);
        Ok(key)
    }
}

/// Derive the CBC key: the first 16 bytes of
/// `SHA-512(content_key || ecdh_shared)`.
fn derive_cbc_key(content_key: &[u8; 16], ecdh_shared: &[u8; 32]) -> [u8; 16] {
    let mut hasher = Sha512::new();
    hasher.update(content_key);
    hasher.update(ecdh_shared);
    let digest = hasher.finalize();

    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[..16]);
    key
}

/// Per-receiver payload decryptor.
///
/// Each receive loop owns its own instance; instances are never shared
/// between the control and data handlers. The first packet triggers key
/// recovery and caches the plaintext key on the session record.
pub struct PayloadCipher {
    session: Arc<StreamSession>,
    recovery: Arc<dyn KeyRecovery>,
    cipher: Option<Aes128>,
}

impl PayloadCipher {
    /// Create a cipher for one receive loop.
    #[must_use]
    pub fn new(session: Arc<StreamSession>, recovery: Arc<dyn KeyRecovery>) -> Self {
        Self {
            session,
            recovery,
            cipher: None,
        }
    }

    /// Decrypt an audio payload body in place.
    ///
    /// Only the leading whole blocks are ciphertext; the residual 1-15
    /// bytes stay as received. The session IV restarts the CBC chain on
    /// every call.
    ///
    /// # Errors
    /// Returns `CryptoError` if the content key cannot be recovered; the
    /// caller drops the packet and the loop continues.
    pub fn decrypt_in_place(&mut self, payload: &mut [u8]) -> Result<(), CryptoError> {
        let encrypted_len = (payload.len() / BLOCK_SIZE) * BLOCK_SIZE;
        if encrypted_len == 0 {
            return Ok(());
        }

        if self.cipher.is_none() {
            self.cipher = Some(self.init_cipher()?);
        }
        let cipher = self.cipher.as_ref().ok_or(CryptoError::MissingKeyMaterial)?;

        let mut prev_block = self.session.aes_iv;
        for chunk in payload[..encrypted_len].chunks_exact_mut(BLOCK_SIZE) {
            let mut ciphertext = [0u8; BLOCK_SIZE];
            ciphertext.copy_from_slice(chunk);

            let block = GenericArray::from_mut_slice(chunk);
            cipher.decrypt_block(block);

            for (b, p) in block.iter_mut().zip(prev_block.iter()) {
                *b ^= *p;
            }
            prev_block = ciphertext;
        }

        Ok(())
    }

    fn init_cipher(&self) -> Result<Aes128, CryptoError> {
        let content_key = match self.session.decrypted_key() {
            Some(key) => *key,
            None => {
                let key = self
                    .recovery
                    .unwrap_key(&self.session.key_message, &self.session.aes_key_enc)?;
                *self.session.cache_decrypted_key(key)
            }
        };

        let cbc_key = derive_cbc_key(&content_key, &self.session.ecdh_shared);
        Ok(Aes128::new(GenericArray::from_slice(&cbc_key)))
    }
}

/// Sender-side CBC encryption mirroring the receive path, for tests that
/// need realistic ciphertext.
#[cfg(test)]
pub(crate) fn encrypt_reference(session: &StreamSession, plaintext: &[u8]) -> Vec<u8> {
    use aes::cipher::BlockEncrypt;

    let content_key = DirectKeyRecovery
        .unwrap_key(&session.key_message, &session.aes_key_enc)
        .expect("session key material");
    let cbc_key = derive_cbc_key(&content_key, &session.ecdh_shared);
    let cipher = Aes128::new(GenericArray::from_slice(&cbc_key));

    let encrypted_len = (plaintext.len() / BLOCK_SIZE) * BLOCK_SIZE;
    let mut out = plaintext.to_vec();
    let mut prev = session.aes_iv;
    for chunk in out[..encrypted_len].chunks_exact_mut(BLOCK_SIZE) {
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= *p;
        }
        let block = GenericArray::from_mut_slice(chunk);
        cipher.encrypt_block(block);
        prev.copy_from_slice(chunk);
    }
    out
}
