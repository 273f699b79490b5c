//! Data port receiver
//!
//! Receives the primary audio flow, feeds the ingest pipeline, drains the
//! ring to the sink, and triggers retransmit requests for leading gaps.
//! Owns its own cipher instance; the control receiver never shares it.

use std::sync::Arc;

use crate::crypto::PayloadCipher;
use crate::protocol::MAX_PACKET_SIZE;
use crate::receiver::audio_session::{AudioSession, IngestOutcome, IngestScratch};

/// Consecutive receive failures tolerated before the loop gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 16;

/// Receive loop for the data socket.
pub struct DataReceiver {
    session: Arc<AudioSession>,
    cipher: PayloadCipher,
    scratch: IngestScratch,
}

impl DataReceiver {
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
        let socket = self.session.data_socket().clone();
        let cancel = self.session.cancel_token().clone();
        let no_resend = self.session.is_mirroring();
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut consecutive_errors = 0u32;

        loop {
            let (len, peer) = tokio::select! {
                () = cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        self.session.socket_error();
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            tracing::error!("data socket unusable, stopping: {e}");
                            break;
                        }
                        tracing::warn!("data socket receive error: {e}");
                        continue;
                    }
                },
            };
            consecutive_errors = 0;

            let outcome = self
                .session
                .ingest_audio(&mut self.cipher, &mut self.scratch, &buf[..len])
                .await;

            self.session.drain_and_deliver(no_resend);

            if !no_resend && outcome == IngestOutcome::Admitted {
                self.session.maybe_request_resend(peer);
            }
        }

        tracing::debug!("data receiver stopped");
    }
}
