//! Shared fixtures for receiver tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::config::AudioSessionConfig;
use crate::crypto::{DirectKeyRecovery, encrypt_reference};
use crate::protocol::{AudioPacketHeader, PACKET_TYPE_AUDIO_OVER_CONTROL, ResendRequest, SyncPacket};
use crate::receiver::AudioSession;
use crate::receiver::audio_session::AudioSessionHandle;
use crate::session::{AudioFormat, SessionStore, StreamSession};
use crate::sink::{PcmFrame, PcmSink};

/// Seconds between the NTP and POSIX epochs.
pub const NTP_EPOCH_OFFSET_SECS: u32 = 2_208_988_800;

/// Sink that records everything it is handed.
#[derive(Default)]
pub struct CollectingSink {
    frames: Mutex<Vec<PcmFrame>>,
    flushes: AtomicUsize,
}

impl CollectingSink {
    pub fn frames(&self) -> Vec<PcmFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn sequences(&self) -> Vec<u16> {
        self.frames().iter().map(|f| f.sequence).collect()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl PcmSink for CollectingSink {
    fn on_pcm(&self, frame: &PcmFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }

    fn on_flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A session record with working key material.
pub fn test_session(format: AudioFormat) -> StreamSession {
    StreamSession {
        aes_key_enc: vec![0x11; 16],
        aes_iv: [0x22; 16],
        ecdh_shared: [0x33; 32],
        format,
        ..StreamSession::default()
    }
}

/// A running session plus the fake peer talking to it.
pub struct Rig {
    pub session: Arc<AudioSession>,
    pub handle: AudioSessionHandle,
    pub sink: Arc<CollectingSink>,
    pub peer: UdpSocket,
    session_record: Arc<StreamSession>,
}

impl Rig {
    pub async fn start(format: AudioFormat, is_mirroring: bool) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let store = SessionStore::new();
        let session_record = store.upsert("test-session", test_session(format)).await;

        let sink = Arc::new(CollectingSink::default());
        let config = AudioSessionConfig {
            session_id: "test-session".to_string(),
            is_mirroring,
            ..AudioSessionConfig::default()
        };

        let session = AudioSession::bind(
            config,
            &store,
            sink.clone(),
            Arc::new(DirectKeyRecovery),
        )
        .await
        .unwrap();
        let handle = session.spawn();

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        Self {
            session,
            handle,
            sink,
            peer,
            session_record,
        }
    }

    /// Build one data packet with an encrypted payload.
    pub fn data_packet(&self, seq: u16, rtp_ts: u32, plaintext: &[u8]) -> Vec<u8> {
        let header = AudioPacketHeader {
            flags: 0x80,
            payload_type: 0x60,
            marker: true,
            sequence: seq,
            timestamp: rtp_ts,
            ssrc: 0x1234_5678,
        };
        let mut out = header.encode().to_vec();
        out.extend_from_slice(&encrypt_reference(&self.session_record, plaintext));
        out
    }

    pub async fn send_data(&self, packet: &[u8]) {
        self.peer
            .send_to(packet, ("127.0.0.1", self.session.data_port()))
            .await
            .unwrap();
    }

    pub async fn send_control(&self, packet: &[u8]) {
        self.peer
            .send_to(packet, ("127.0.0.1", self.session.control_port()))
            .await
            .unwrap();
    }

    /// Send a sync packet placing `rtp_ts` at `posix_us` wall-clock.
    pub async fn send_sync(&self, rtp_ts: u32, posix_us: u64) {
        #[allow(clippy::cast_possible_truncation)]
        let sync = SyncPacket {
            rtp_timestamp: rtp_ts,
            ntp_seconds: NTP_EPOCH_OFFSET_SECS + (posix_us / 1_000_000) as u32,
            ntp_fraction: (((posix_us % 1_000_000) << 32) / 1_000_000) as u32,
            next_timestamp: rtp_ts,
        };
        self.send_control(&sync.encode()).await;
    }

    /// Wrap a data packet in the audio-over-control envelope.
    pub fn control_audio_packet(&self, seq: u16, rtp_ts: u32, plaintext: &[u8]) -> Vec<u8> {
        let mut out = vec![0x80, 0x80 | PACKET_TYPE_AUDIO_OVER_CONTROL, 0x00, 0x00];
        out.extend_from_slice(&self.data_packet(seq, rtp_ts, plaintext));
        out
    }

    /// Wait until the sink holds at least `count` frames.
    pub async fn wait_for_frames(&self, count: usize) {
        for _ in 0..200 {
            if self.sink.frame_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "timed out waiting for {count} frames, have {}",
            self.sink.frame_count()
        );
    }

    /// Gather every retransmit request the peer sees within `window`.
    pub async fn collect_resend_requests(&self, window: Duration) -> Vec<ResendRequest> {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.peer.recv_from(&mut buf)).await {
                Ok(Ok((len, _))) if len == ResendRequest::SIZE && buf[1] == 0xD5 => {
                    out.push(ResendRequest::decode(&buf[..len]).unwrap());
                }
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }
        out
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

/// A PCM payload that survives the identity decoder byte for byte.
pub fn pcm_payload(seq: u16) -> Vec<u8> {
    let mut out = vec![0u8; 1408];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (usize::from(seq) + i) as u8;
    }
    out
}
