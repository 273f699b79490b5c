//! Retransmit request tracking
//!
//! Stamps outgoing requests with a monotonically incrementing control
//! sequence and suppresses repeats: while the same leading gap is still
//! outstanding there is nothing new to tell the sender.

use crate::protocol::ResendRequest;

/// Decides whether an observed leading gap warrants a request.
#[derive(Debug, Default)]
pub struct ResendTracker {
    control_seq: u16,
    last_gap: Option<(u16, u16)>,
}

impl ResendTracker {
    /// Create a tracker with the control sequence at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a gap observation into a request, or nothing if the identical
    /// gap was already requested. The control sequence post-increments on
    /// every emitted request.
    pub fn request_for(&mut self, gap: Option<(u16, u16)>) -> Option<ResendRequest> {
        let Some((first_seq, count)) = gap else {
            self.last_gap = None;
            return None;
        };

        if self.last_gap == Some((first_seq, count)) {
            return None;
        }
        self.last_gap = Some((first_seq, count));

        let request = ResendRequest {
            control_seq: self.control_seq,
            first_seq,
            count,
        };
        self.control_seq = self.control_seq.wrapping_add(1);
        Some(request)
    }

    /// Current control sequence (the value the next request will carry).
    #[must_use]
    pub fn control_seq(&self) -> u16 {
        self.control_seq
    }
}
