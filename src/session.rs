//! Stream session records and the session store
//!
//! A session record carries the key material and codec identity negotiated
//! by the control plane before the audio ports open. The record is created
//! by an external collaborator and treated as immutable once packets start
//! flowing; the only late write is the decrypted AES key, which is derived
//! on first use and cached behind a one-shot cell.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::RwLock;

/// Audio payload format advertised for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// Apple Lossless
    Alac,
    /// AAC (main profile, raw frames)
    Aac,
    /// AAC Enhanced Low Delay
    AacEld,
    /// Uncompressed 16-bit PCM
    Pcm,
    /// Not advertised; resolved from the compression type fallback
    #[default]
    Unknown,
}

/// Key material and stream identity for one audio session.
///
/// `aes_key_enc` and `key_message` come from the pairing exchange; the
/// plaintext content key is recovered from them once (see
/// [`crate::crypto::KeyRecovery`]) and cached here.
#[derive(Debug, Default)]
pub struct StreamSession {
    /// Encrypted AES content key
    pub aes_key_enc: Vec<u8>,
    /// AES CBC initialization vector, reset per packet
    pub aes_iv: [u8; 16],
    /// Shared secret from the pairing ECDH
    pub ecdh_shared: [u8; 32],
    /// Opaque key-message blob consumed by the key-unwrap transform
    pub key_message: Vec<u8>,
    /// Advertised audio format
    pub format: AudioFormat,
    /// Samples per frame hint from the stream announcement (0 = unset)
    pub samples_per_frame: u32,
    /// Compression type fallback used when `format` is `Unknown`
    pub compression_type: u8,
    /// Plaintext content key, recovered on first packet; the cell itself
    /// enforces the first-write-wins rule
    pub decrypted_key: OnceLock<[u8; 16]>,
}

impl StreamSession {
    /// Get the cached plaintext content key, if already recovered.
    #[must_use]
    pub fn decrypted_key(&self) -> Option<&[u8; 16]> {
        self.decrypted_key.get()
    }

    /// Cache the recovered plaintext content key.
    ///
    /// The first caller wins; later calls are no-ops, which keeps the
    /// record effectively immutable after publication.
    pub fn cache_decrypted_key(&self, key: [u8; 16]) -> &[u8; 16] {
        self.decrypted_key.get_or_init(|| key)
    }

    /// Effective samples-per-frame for a codec default.
    #[must_use]
    pub fn frame_length_or(&self, default: u32) -> u32 {
        if self.samples_per_frame == 0 {
            default
        } else {
            self.samples_per_frame
        }
    }
}

/// Concurrent map of session id to session record.
///
/// Injected into the audio core as a capability; the control plane upserts
/// records as RTSP negotiation progresses and the core looks them up when
/// the audio ports open.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<StreamSession>>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session record.
    pub async fn get(&self, id: &str) -> Option<Arc<StreamSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Look up a session record, inserting a default one if absent.
    pub async fn get_or_default(&self, id: &str) -> Arc<StreamSession> {
        if let Some(session) = self.get(id).await {
            return session;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(StreamSession::default()))
            .clone()
    }

    /// Insert or replace a session record.
    pub async fn upsert(&self, id: &str, session: StreamSession) -> Arc<StreamSession> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .await
            .insert(id.to_string(), session.clone());
        session
    }

    /// Remove a session record.
    pub async fn remove(&self, id: &str) -> Option<Arc<StreamSession>> {
        self.sessions.write().await.remove(id)
    }
}
