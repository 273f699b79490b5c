use bytes::{BufMut, BytesMut};

use super::packet::WireError;

/// Retransmit request for a contiguous run of missing packets.
///
/// Sent on the control socket toward the peer the audio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendRequest {
    /// Control sequence stamped into the request
    pub control_seq: u16,
    /// First missing sequence number
    pub first_seq: u16,
    /// Number of missing packets
    pub count: u16,
}

impl ResendRequest {
    /// Encoded size in bytes
    pub const SIZE: usize = 8;

    /// Encode to the 8-byte control-socket format:
    /// `[0x80, 0xD5, control_seq, first_seq, count]`, big-endian fields.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(0x80);
        buf.put_u8(0x55 | 0x80);
        buf.put_u16(self.control_seq);
        buf.put_u16(self.first_seq);
        buf.put_u16(self.count);

        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode from bytes (used by tests standing in for the peer).
    ///
    /// # Errors
    /// Returns `WireError::TooShort` if fewer than 8 bytes arrived.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < Self::SIZE {
            return Err(WireError::TooShort {
                needed: Self::SIZE,
                have: data.len(),
            });
        }

        Ok(Self {
            control_seq: u16::from_be_bytes([data[2], data[3]]),
            first_seq: u16::from_be_bytes([data[4], data[5]]),
            count: u16::from_be_bytes([data[6], data[7]]),
        })
    }
}
