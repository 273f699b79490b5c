//! Control port receiver
//!
//! Handles sync packets, and during mirroring the secondary audio flow
//! that arrives wrapped on the control socket. Owns its own cipher
//! instance, separate from the data receiver's.

use std::sync::Arc;

use crate::crypto::PayloadCipher;
use crate::protocol::{
    CONTROL_ENVELOPE_LEN, MAX_PACKET_SIZE, PACKET_TYPE_AUDIO_OVER_CONTROL, PACKET_TYPE_SYNC,
    packet_type,
};
use crate::receiver::audio_session::{AudioSession, IngestScratch};

/// Consecutive receive failures tolerated before the loop gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 16;

/// Receive loop for the control socket.
pub struct ControlReceiver {
    session: Arc<AudioSession>,
    cipher: PayloadCipher,
    scratch: IngestScratch,
}

impl ControlReceiver {
    /// Create the receiver with its own cipher instance.
    #[must_use]
    pub fn new(session: Arc<AudioSession>) -> Self {
        let cipher = PayloadCipher::new(
            session.stream_session().clone(),
            session.key_recovery().clone(),
        );
        Self {
            session,
            cipher,
            scratch: IngestScratch::new(),
        }
    }

    /// Run until cancellation or an unrecoverable socket error.
    pub async fn run(mut self) {
        let socket = self.session.control_socket().clone();
        let cancel = self.session.cancel_token().clone();
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut consecutive_errors = 0u32;

        loop {
            let (len, _peer) = tokio::select! {
                () = cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        self.session.socket_error();
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            tracing::error!("control socket unusable, stopping: {e}");
                            break;
                        }
                        tracing::warn!("control socket receive error: {e}");
                        continue;
                    }
                },
            };
            consecutive_errors = 0;

            let datagram = &buf[..len];
            match packet_type(datagram) {
                Some(PACKET_TYPE_AUDIO_OVER_CONTROL) => {
                    if len <= CONTROL_ENVELOPE_LEN {
                        continue;
                    }
                    self.session
                        .ingest_audio(
                            &mut self.cipher,
                            &mut self.scratch,
                            &datagram[CONTROL_ENVELOPE_LEN..],
                        )
                        .await;
                    self.session.drain_and_deliver(true);
                }
                Some(PACKET_TYPE_SYNC) => self.session.apply_sync(datagram),
                _ => {}
            }
        }

        tracing::debug!("control receiver stopped");
    }
}
