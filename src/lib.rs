//! # raop-audio
//!
//! The real-time audio core of an `AirPlay` (RAOP) receiver: two UDP flows
//! in, decoded PCM frames with stable presentation timestamps out.
//!
//! The crate ingests the control and data sockets of one audio session,
//! recovers clock sync from the sender's NTP-style sync packets, decrypts
//! AES-CBC payload bodies, decodes ALAC/AAC/AAC-ELD/PCM frames, reorders
//! them through a fixed 1024-slot dejitter ring, asks for retransmission of
//! missing packets, and hands each frame to a [`sink::PcmSink`].
//!
//! Discovery, RTSP negotiation, pairing, and audio output live with the
//! collaborators; the session record they negotiate arrives through a
//! [`session::SessionStore`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use raop_audio::{AudioSession, AudioSessionConfig, DirectKeyRecovery, SessionStore};
//! use raop_audio::sink::{PcmFrame, PcmSink};
//!
//! struct Player;
//! impl PcmSink for Player {
//!     fn on_pcm(&self, frame: &PcmFrame) { /* queue frame.pcm at frame.pts_us */ }
//!     fn on_flush(&self) { /* drop queued audio */ }
//! }
//!
//! # async fn example(store: SessionStore) -> Result<(), raop_audio::AudioCoreError> {
//! let config = AudioSessionConfig {
//!     session_id: "rtsp-session-1".to_string(),
//!     ..AudioSessionConfig::default()
//! };
//! let session = AudioSession::bind(config, &store, Arc::new(Player), Arc::new(DirectKeyRecovery)).await?;
//! let handle = session.spawn();
//! // ... stream runs; tell the sender our ports via RTSP ...
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Dejitter ring
pub mod buffer;
/// Decoder selection and the decode contract
pub mod codec;
/// Session configuration surface
pub mod config;
/// Payload decryption and key recovery
pub mod crypto;
/// Error types
pub mod error;
/// Wire formats
pub mod protocol;
/// The session core and its receive loops
pub mod receiver;
/// Sequence number arithmetic
pub mod seq;
/// Session records and the session store
pub mod session;
/// The PCM sink capability
pub mod sink;
/// Clock sync and presentation timestamps
pub mod timing;

// Re-exports
pub use buffer::{AdmitOutcome, CircularBuffer};
pub use codec::{AudioDecoder, DecoderConfig};
pub use config::AudioSessionConfig;
pub use crypto::{DirectKeyRecovery, KeyRecovery};
pub use error::AudioCoreError;
pub use receiver::{AudioSession, AudioSessionHandle, StatsSnapshot};
pub use session::{AudioFormat, SessionStore, StreamSession};
pub use sink::{PcmFrame, PcmSink};
pub use timing::{SyncHandle, SyncState};
