//! Wire formats for the two UDP audio flows
//!
//! Parsing and encoding only; no sockets. The receive loops in
//! [`crate::receiver`] feed raw datagrams through these types.

mod packet;
mod resend;

#[cfg(test)]
mod resend_tests;

pub use packet::{
    AudioPacketHeader, SyncPacket, WireError, is_keepalive, packet_type, CONTROL_ENVELOPE_LEN,
    MAX_PACKET_SIZE, PACKET_TYPE_AUDIO_OVER_CONTROL, PACKET_TYPE_SYNC,
};
pub use resend::ResendRequest;
