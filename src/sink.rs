//! PCM sink capability
//!
//! The session core delivers decoded audio to a single sink per session.
//! The sink is untrusted: the core never holds its buffer lock across a
//! callback, and a panicking sink propagates out of the receive loop.

use bytes::Bytes;

/// One decoded audio frame, interleaved signed-16 stereo PCM.
#[derive(Debug, Clone)]
pub struct PcmFrame {
    /// Sequence number the frame was dequeued at
    pub sequence: u16,
    /// RTP timestamp from the packet the frame arrived in
    pub rtp_timestamp: u32,
    /// Presentation time in wall-clock microseconds
    pub pts_us: i64,
    /// Decoded samples; empty when a missing slot was skipped over
    pub pcm: Bytes,
}

/// Downstream consumer of decoded audio.
pub trait PcmSink: Send + Sync {
    /// Called once per dequeued frame, in buffer-dequeue order.
    fn on_pcm(&self, frame: &PcmFrame);

    /// Called after the ring has been flushed on behalf of a collaborator.
    fn on_flush(&self);
}
