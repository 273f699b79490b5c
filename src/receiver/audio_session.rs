//! The audio session: shared state and the common ingest pipeline

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::buffer::{AdmitOutcome, CircularBuffer, SlotHeader};
use crate::codec::{AudioDecoder, select_decoder};
use crate::config::AudioSessionConfig;
use crate::crypto::{KeyRecovery, PayloadCipher};
use crate::error::AudioCoreError;
use crate::protocol::{AudioPacketHeader, MAX_PACKET_SIZE, SyncPacket, is_keepalive};
use crate::receiver::control_receiver::ControlReceiver;
use crate::receiver::data_receiver::DataReceiver;
use crate::receiver::resend::ResendTracker;
use crate::receiver::stats::{ReceiverStats, StatsSnapshot};
use crate::session::{SessionStore, StreamSession};
use crate::sink::{PcmFrame, PcmSink};
use crate::timing::SyncHandle;

/// Receivers must unblock within this long of a cancellation.
pub(crate) const CLOSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// How the ingest pipeline disposed of a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IngestOutcome {
    /// A new frame landed in the ring
    Admitted,
    /// Keepalive or duplicate/old packet; nothing new in the ring
    NoOp,
    /// Malformed or undecryptable; dropped
    Dropped,
}

/// Per-receiver scratch space so the steady-state path stays allocation
/// free.
pub(crate) struct IngestScratch {
    payload: Vec<u8>,
    pcm: Vec<u8>,
}

impl IngestScratch {
    pub(crate) fn new() -> Self {
        Self {
            payload: Vec::with_capacity(MAX_PACKET_SIZE),
            pcm: Vec::new(),
        }
    }
}

/// One audio session's shared state.
///
/// The buffer mutex covers ring mutation only; decrypt and decode run
/// outside it, and sink callbacks run outside every lock.
pub struct AudioSession {
    config: AudioSessionConfig,
    session: Arc<StreamSession>,
    sink: Arc<dyn PcmSink>,
    key_recovery: Arc<dyn KeyRecovery>,
    control_socket: Arc<UdpSocket>,
    data_socket: Arc<UdpSocket>,
    buffer: Mutex<CircularBuffer>,
    // Async mutex: decode may suspend on the out-of-process decoder's pipes
    decoder: tokio::sync::Mutex<Option<Box<dyn AudioDecoder>>>,
    resend: Mutex<ResendTracker>,
    // Serializes sink callbacks so both receive loops deliver in dequeue
    // order; never nested inside the buffer mutex.
    delivery: Mutex<()>,
    sync: SyncHandle,
    stats: ReceiverStats,
    cancel: CancellationToken,
}

/// Join handles for a running session's receive tasks.
pub struct AudioSessionHandle {
    control: tokio::task::JoinHandle<()>,
    data: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl AudioSession {
    /// Bind the session's UDP sockets and resolve its session record.
    ///
    /// # Errors
    /// Returns `AudioCoreError::UnknownSession` if the store has no record
    /// for the configured id, or a socket error if binding fails.
    pub async fn bind(
        config: AudioSessionConfig,
        store: &SessionStore,
        sink: Arc<dyn PcmSink>,
        key_recovery: Arc<dyn KeyRecovery>,
    ) -> Result<Arc<Self>, AudioCoreError> {
        let session = store
            .get(&config.session_id)
            .await
            .ok_or_else(|| AudioCoreError::UnknownSession(config.session_id.clone()))?;

        let control_socket = UdpSocket::bind(("0.0.0.0", config.control_port)).await?;
        let data_socket = UdpSocket::bind(("0.0.0.0", config.data_port)).await?;

        // Slots must hold the largest frame any codec here produces.
        let pcm_capacity = session.frame_length_or(1024).max(1024) as usize * 4;

        Ok(Arc::new(Self {
            config,
            session,
            sink,
            key_recovery,
            control_socket: Arc::new(control_socket),
            data_socket: Arc::new(data_socket),
            buffer: Mutex::new(CircularBuffer::new(pcm_capacity)),
            decoder: tokio::sync::Mutex::new(None),
            resend: Mutex::new(ResendTracker::new()),
            delivery: Mutex::new(()),
            sync: SyncHandle::new(),
            stats: ReceiverStats::default(),
            cancel: CancellationToken::new(),
        }))
    }

    /// Spawn both receive tasks.
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> AudioSessionHandle {
        let control = tokio::spawn(ControlReceiver::new(self.clone()).run());
        let data = tokio::spawn(DataReceiver::new(self.clone()).run());

        AudioSessionHandle {
            control,
            data,
            cancel: self.cancel.clone(),
        }
    }

    /// Port the control socket bound to.
    #[must_use]
    pub fn control_port(&self) -> u16 {
        self.control_socket.local_addr().map_or(0, |a| a.port())
    }

    /// Port the data socket bound to.
    #[must_use]
    pub fn data_port(&self) -> u16 {
        self.data_socket.local_addr().map_or(0, |a| a.port())
    }

    /// Counters snapshot.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Signal both receive tasks to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Flush the ring and notify the sink.
    ///
    /// The only externally driven state mutation: the collaborator calls
    /// this when the sender repositions the stream.
    pub fn flush(&self, next_seq: i32) {
        let _delivery = self.delivery.lock().unwrap();
        {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.flush(next_seq);
        }
        self.sink.on_flush();
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn control_socket(&self) -> &Arc<UdpSocket> {
        &self.control_socket
    }

    pub(crate) fn data_socket(&self) -> &Arc<UdpSocket> {
        &self.data_socket
    }

    pub(crate) fn stream_session(&self) -> &Arc<StreamSession> {
        &self.session
    }

    pub(crate) fn key_recovery(&self) -> &Arc<dyn KeyRecovery> {
        &self.key_recovery
    }

    pub(crate) fn is_mirroring(&self) -> bool {
        self.config.is_mirroring
    }

    pub(crate) fn socket_error(&self) {
        self.stats.socket_error();
    }

    /// Apply a sync packet from the control socket.
    pub(crate) fn apply_sync(&self, datagram: &[u8]) {
        match SyncPacket::decode(datagram) {
            Ok(packet) => self.sync.apply(&packet),
            Err(e) => {
                self.stats.malformed();
                tracing::warn!("bad sync packet: {e}");
            }
        }
    }

    /// The common ingest pipeline: bounds check, keepalive short-circuit,
    /// header extraction, decrypt, decode, admit.
    ///
    /// `datagram` is a full data packet (header at byte 0). Decrypt and
    /// decode run outside the buffer mutex; only the admit takes it.
    pub(crate) async fn ingest_audio(
        &self,
        cipher: &mut PayloadCipher,
        scratch: &mut IngestScratch,
        datagram: &[u8],
    ) -> IngestOutcome {
        if datagram.len() < AudioPacketHeader::SIZE || datagram.len() > MAX_PACKET_SIZE {
            self.stats.malformed();
            return IngestOutcome::Dropped;
        }
        self.stats.packet_received();

        if is_keepalive(datagram) {
            self.stats.keepalive();
            return IngestOutcome::NoOp;
        }

        let header = match AudioPacketHeader::decode(datagram) {
            Ok(header) => header,
            Err(e) => {
                self.stats.malformed();
                tracing::warn!("bad audio packet: {e}");
                return IngestOutcome::Dropped;
            }
        };

        #[cfg(feature = "dump")]
        if let Some(dir) = &self.config.dump_path {
            super::dump::write_raw(dir, header.sequence, &datagram[AudioPacketHeader::SIZE..])
                .await;
        }

        scratch.payload.clear();
        scratch
            .payload
            .extend_from_slice(&datagram[AudioPacketHeader::SIZE..]);
        if let Err(e) = cipher.decrypt_in_place(&mut scratch.payload) {
            self.stats.decrypt_error();
            tracing::warn!(seq = header.sequence, "decrypt failed: {e}");
            return IngestOutcome::Dropped;
        }

        if !self.decode_into_scratch(scratch, header.sequence).await {
            return IngestOutcome::Dropped;
        }

        #[cfg(feature = "dump")]
        if let Some(dir) = &self.config.dump_path {
            super::dump::write_pcm(dir, header.sequence, &scratch.pcm).await;
        }

        let outcome = {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.admit(
                SlotHeader {
                    sequence: header.sequence,
                    rtp_timestamp: header.timestamp,
                    ssrc: header.ssrc,
                    payload_type: header.payload_type,
                    flags: header.flags,
                },
                &scratch.pcm,
            )
        };

        match outcome {
            AdmitOutcome::Admitted => IngestOutcome::Admitted,
            AdmitOutcome::Duplicate | AdmitOutcome::Old => IngestOutcome::NoOp,
            AdmitOutcome::Rejected => {
                self.stats.malformed();
                IngestOutcome::Dropped
            }
        }
    }

    /// Decode the decrypted payload into `scratch.pcm`, substituting
    /// silence of the decoder's output size when the frame does not decode
    /// so the timestamp cadence survives.
    ///
    /// Returns false only when no decoder could be configured at all.
    async fn decode_into_scratch(&self, scratch: &mut IngestScratch, sequence: u16) -> bool {
        let mut guard = self.decoder.lock().await;

        if guard.is_none() {
            match select_decoder(&self.session, &self.config.eld_decoder_command) {
                Ok(decoder) => *guard = Some(decoder),
                Err(e) => {
                    tracing::error!("no decoder for session format: {e}");
                    return false;
                }
            }
        }
        let Some(decoder) = guard.as_mut() else {
            return false;
        };

        match decoder.decode(&scratch.payload).await {
            Ok(pcm) => {
                scratch.pcm.clear();
                scratch.pcm.extend_from_slice(pcm);
            }
            Err(e) => {
                self.stats.decode_error();
                tracing::warn!(seq = sequence, "decode failed, substituting silence: {e}");
                let output_size = decoder.output_size();
                scratch.pcm.clear();
                scratch.pcm.resize(output_size, 0);
            }
        }
        true
    }

    /// Dequeue every ready frame, stamp presentation times, and deliver.
    ///
    /// Frames are collected under the buffer mutex, which is released
    /// before the first sink callback; the delivery lock keeps the two
    /// receive loops from interleaving their batches at the sink.
    pub(crate) fn drain_and_deliver(&self, no_resend: bool) {
        let _delivery = self.delivery.lock().unwrap();

        let mut frames = Vec::new();
        {
            let mut buffer = self.buffer.lock().unwrap();
            while let Some(frame) = buffer.dequeue(no_resend) {
                frames.push(frame);
            }
        }
        if frames.is_empty() {
            return;
        }

        self.stats.frames_delivered(frames.len() as u64);
        for frame in frames {
            let pts_us = self.sync.pts_us(frame.rtp_timestamp);
            self.sink.on_pcm(&PcmFrame {
                sequence: frame.sequence,
                rtp_timestamp: frame.rtp_timestamp,
                pts_us,
                pcm: frame.pcm.into(),
            });
        }
    }

    /// Ask the sender to retransmit the leading gap, if there is a new one.
    ///
    /// Best effort: the request goes out on the control socket toward the
    /// peer the audio came from, and a send failure is logged, not retried.
    pub(crate) fn maybe_request_resend(&self, peer: SocketAddr) {
        let gap = {
            let buffer = self.buffer.lock().unwrap();
            buffer.leading_gap()
        };

        let request = {
            let mut resend = self.resend.lock().unwrap();
            resend.request_for(gap)
        };

        if let Some(request) = request {
            self.stats.resend_requested();
            tracing::debug!(
                first_seq = request.first_seq,
                count = request.count,
                "requesting retransmit"
            );
            if let Err(e) = self.control_socket.try_send_to(&request.encode(), peer) {
                tracing::warn!("retransmit request not sent: {e}");
            }
        }
    }
}

impl AudioSessionHandle {
    /// Stop both receivers and wait for them, aborting any that outlive
    /// the close timeout.
    pub async fn shutdown(self) {
        self.cancel.cancel();

        let control_abort = self.control.abort_handle();
        let data_abort = self.data.abort_handle();

        let joined = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let _ = self.control.await;
            let _ = self.data.await;
        })
        .await;

        if joined.is_err() {
            tracing::warn!("receivers did not stop within the close timeout");
            control_abort.abort();
            data_abort.abort();
        }
    }
}
