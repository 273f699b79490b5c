use thiserror::Error;

/// Largest datagram the receive loops accept.
pub const MAX_PACKET_SIZE: usize = 50_000;

/// Sync packet type on the control socket.
pub const PACKET_TYPE_SYNC: u8 = 0x54;

/// Audio carried on the control socket (mirroring and retransmitted
/// packets arrive this way), wrapped in a 4-byte envelope.
pub const PACKET_TYPE_AUDIO_OVER_CONTROL: u8 = 0x56;

/// Size of the envelope in front of an audio-over-control payload.
pub const CONTROL_ENVELOPE_LEN: usize = 4;

/// Trailer that marks a 16-byte no-data keepalive packet.
const KEEPALIVE_TRAILER: [u8; 4] = [0x00, 0x68, 0x34, 0x00];

/// Wire format errors
#[derive(Debug, Error)]
pub enum WireError {
    /// Datagram shorter than the structure being parsed
    #[error("packet too short: need {needed} bytes, have {have}")]
    TooShort {
        /// Minimum length required
        needed: usize,
        /// Actual length received
        have: usize,
    },

    /// Datagram longer than the receive contract allows
    #[error("packet too large: {0} bytes")]
    Oversize(usize),
}

/// Packet type from the second header byte, with the marker bit masked off.
#[must_use]
pub fn packet_type(data: &[u8]) -> Option<u8> {
    data.get(1).map(|b| b & 0x7F)
}

/// Detect the no-data keepalive marker: exactly 16 bytes ending in
/// `00 68 34 00`. These packets carry no audio and must not touch the ring.
#[must_use]
pub fn is_keepalive(data: &[u8]) -> bool {
    data.len() == 16 && data[12..16] == KEEPALIVE_TRAILER
}

/// Header of an audio data packet.
///
/// Layout: `[0]=flags`, `[1]=marker|type`, `[2..4]=seq`, `[4..8]=rtp_ts`,
/// `[8..12]=ssrc`, payload from byte 12. All fields big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPacketHeader {
    /// First header byte, carried through to the buffer slot
    pub flags: u8,
    /// Payload type (7 bits, marker bit stripped)
    pub payload_type: u8,
    /// Marker bit from byte 1
    pub marker: bool,
    /// Sequence number
    pub sequence: u16,
    /// RTP timestamp
    pub timestamp: u32,
    /// Synchronization source
    pub ssrc: u32,
}

impl AudioPacketHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    /// Decode a header from the front of a datagram.
    ///
    /// # Errors
    /// Returns `WireError` if the datagram violates the length bounds.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < Self::SIZE {
            return Err(WireError::TooShort {
                needed: Self::SIZE,
                have: data.len(),
            });
        }
        if data.len() > MAX_PACKET_SIZE {
            return Err(WireError::Oversize(data.len()));
        }

        Ok(Self {
            flags: data[0],
            payload_type: data[1] & 0x7F,
            marker: data[1] & 0x80 != 0,
            sequence: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }

    /// Encode the header (used by tests and fixtures).
    #[must_use]
    pub fn encode(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[0] = self.flags;
        buf[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        buf
    }
}

/// Sync packet from the control socket.
///
/// Layout: `[0]=flags`, `[1]=0xD4`, `[4..8]=rtp_ts`, `[8..12]=ntp_sec`,
/// `[12..16]=ntp_frac`, `[16..20]=next_ts`. NTP fields are read unsigned;
/// a signed read would sign-extend timestamps past 2036.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPacket {
    /// RTP timestamp at the sync point
    pub rtp_timestamp: u32,
    /// NTP seconds since 1900
    pub ntp_seconds: u32,
    /// NTP fractional seconds (1/2^32 units)
    pub ntp_fraction: u32,
    /// RTP timestamp of the next packet; unused by the core, kept for
    /// observability
    pub next_timestamp: u32,
}

impl SyncPacket {
    /// Minimum sync packet size
    pub const SIZE: usize = 20;

    /// Decode a sync packet.
    ///
    /// # Errors
    /// Returns `WireError::TooShort` if fewer than 20 bytes arrived.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < Self::SIZE {
            return Err(WireError::TooShort {
                needed: Self::SIZE,
                have: data.len(),
            });
        }

        Ok(Self {
            rtp_timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ntp_seconds: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            ntp_fraction: u32::from_be_bytes([data[12], data[13], data[14], data[15]]),
            next_timestamp: u32::from_be_bytes([data[16], data[17], data[18], data[19]]),
        })
    }

    /// Encode a sync packet (used by tests and fixtures).
    #[must_use]
    pub fn encode(&self) -> [u8; 20] {
        let mut buf = [0u8; 20];
        buf[0] = 0x80;
        buf[1] = 0x80 | PACKET_TYPE_SYNC;
        buf[4..8].copy_from_slice(&self.rtp_timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ntp_seconds.to_be_bytes());
        buf[12..16].copy_from_slice(&self.ntp_fraction.to_be_bytes());
        buf[16..20].copy_from_slice(&self.next_timestamp.to_be_bytes());
        buf
    }
}
