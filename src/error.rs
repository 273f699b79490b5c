//! Error types

use crate::codec::CodecError;
use crate::crypto::CryptoError;
use crate::protocol::WireError;

/// Top-level error for audio session operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioCoreError {
    /// Socket setup or teardown failed.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// Packet did not parse as any known wire format.
    #[error("wire format error: {0}")]
    Wire(#[from] WireError),

    /// Payload decryption failed.
    #[error("decrypt error: {0}")]
    Decrypt(#[from] CryptoError),

    /// Decoder selection or configuration failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No session record exists for the configured session id.
    #[error("unknown session: {0}")]
    UnknownSession(String),
}
