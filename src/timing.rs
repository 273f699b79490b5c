//! Clock synchronization and presentation timestamps
//!
//! Sync packets on the control socket carry an NTP wall-clock timestamp and
//! the RTP timestamp that was current at that instant. The pair maps any
//! frame's RTP timestamp onto wall-clock microseconds. The mapping is kept
//! behind a read/write lock so a PTS computation always sees one coherent
//! sync point.

use std::sync::{Arc, RwLock};

use crate::protocol::SyncPacket;

/// Seconds between the NTP epoch (1900) and the POSIX epoch (1970).
const NTP_EPOCH_OFFSET_SECS: i64 = 2_208_988_800;

/// Stream sample rate; fixed for this transport.
const SAMPLE_RATE: i64 = 44_100;

/// One sync point: wall-clock microseconds and the RTP timestamp then.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Wall-clock microseconds at the sync point (POSIX epoch)
    pub sync_time_us: i64,
    /// RTP timestamp at the sync point
    pub sync_rtp_ts: u32,
    /// The sender's announced next RTP timestamp; kept for observability
    pub next_rtp_ts: u32,
}

impl SyncState {
    /// Build a sync point from a parsed sync packet.
    ///
    /// NTP fields are treated unsigned throughout, so timestamps past 2036
    /// do not sign-extend.
    #[must_use]
    pub fn from_packet(packet: &SyncPacket) -> Self {
        let ntp_us = u64::from(packet.ntp_seconds) * 1_000_000
            + ((u64::from(packet.ntp_fraction) * 1_000_000) >> 32);

        #[allow(
            clippy::cast_possible_wrap,
            reason = "microseconds since 1900 stay far below i64::MAX"
        )]
        let sync_time_us = ntp_us as i64 - NTP_EPOCH_OFFSET_SECS * 1_000_000;

        Self {
            sync_time_us,
            sync_rtp_ts: packet.rtp_timestamp,
            next_rtp_ts: packet.next_timestamp,
        }
    }

    /// Presentation time for a frame with RTP timestamp `rtp_ts`.
    ///
    /// The timestamp difference is taken as signed 32-bit so frames that
    /// land slightly behind the sync point still map sensibly; the mapping
    /// wraps with the RTP counter after ~12 hours, matching the stream's
    /// own wrap.
    #[must_use]
    pub fn pts_us(&self, rtp_ts: u32) -> i64 {
        let ticks = i64::from(rtp_ts.wrapping_sub(self.sync_rtp_ts) as i32);
        ticks * 1_000_000 / SAMPLE_RATE + self.sync_time_us
    }
}

/// Shared handle to the session's sync point.
#[derive(Debug, Clone, Default)]
pub struct SyncHandle {
    state: Arc<RwLock<SyncState>>,
}

impl SyncHandle {
    /// Create a handle with no sync observed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a sync packet. Visible to every PTS computation that starts
    /// after this returns.
    pub fn apply(&self, packet: &SyncPacket) {
        let state = SyncState::from_packet(packet);
        tracing::debug!(
            rtp_ts = state.sync_rtp_ts,
            time_us = state.sync_time_us,
            "sync point updated"
        );
        if let Ok(mut guard) = self.state.write() {
            *guard = state;
        }
    }

    /// Snapshot the current sync point.
    #[must_use]
    pub fn snapshot(&self) -> SyncState {
        self.state.read().map(|s| *s).unwrap_or_default()
    }

    /// Presentation time for `rtp_ts` against the current sync point.
    ///
    /// Before the first sync packet the state is all zeros and the result
    /// is a small offset from zero; the sink's prebuffer absorbs that.
    #[must_use]
    pub fn pts_us(&self, rtp_ts: u32) -> i64 {
        self.snapshot().pts_us(rtp_ts)
    }
}
