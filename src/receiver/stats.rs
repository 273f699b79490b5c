//! Receive-path counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by both receive loops.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    packets_received: AtomicU64,
    keepalives: AtomicU64,
    malformed: AtomicU64,
    decrypt_errors: AtomicU64,
    decode_errors: AtomicU64,
    socket_errors: AtomicU64,
    frames_delivered: AtomicU64,
    resends_requested: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams that reached the ingest pipeline
    pub packets_received: u64,
    /// No-data keepalive markers
    pub keepalives: u64,
    /// Datagrams dropped for length or header problems
    pub malformed: u64,
    /// Packets dropped because decryption failed
    pub decrypt_errors: u64,
    /// Frames where decode failed and silence was substituted
    pub decode_errors: u64,
    /// Transient socket receive errors
    pub socket_errors: u64,
    /// PCM frames handed to the sink
    pub frames_delivered: u64,
    /// Retransmit requests sent
    pub resends_requested: u64,
}

impl ReceiverStats {
    pub(crate) fn packet_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn keepalive(&self) {
        self.keepalives.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn decrypt_error(&self) {
        self.decrypt_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn socket_error(&self) {
        self.socket_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn frames_delivered(&self, count: u64) {
        self.frames_delivered.fetch_add(count, Ordering::Relaxed);
    }
    pub(crate) fn resend_requested(&self) {
        self.resends_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            keepalives: self.keepalives.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            decrypt_errors: self.decrypt_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            socket_errors: self.socket_errors.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            resends_requested: self.resends_requested.load(Ordering::Relaxed),
        }
    }
}
