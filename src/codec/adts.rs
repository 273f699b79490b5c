//! ADTS framing for raw AAC payloads
//!
//! The stream carries raw AAC frames, but the FDK decoder is driven through
//! its ADTS transport, so each payload gets a 7-byte header prepended. ADTS
//! has a 2-bit profile field that only covers the four legacy object types;
//! anything newer (notably ELD) cannot be represented here.

use bytes::{BufMut, Bytes, BytesMut};

use super::CodecError;

/// AAC audio object types this crate can be asked to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AacObjectType {
    /// AAC Main (AOT 1)
    Main,
    /// AAC Low Complexity (AOT 2)
    LowComplexity,
    /// AAC Enhanced Low Delay (AOT 39)
    Eld,
}

impl AacObjectType {
    /// MPEG-4 audio object type number.
    #[must_use]
    pub fn aot(self) -> u8 {
        match self {
            AacObjectType::Main => 1,
            AacObjectType::LowComplexity => 2,
            AacObjectType::Eld => 39,
        }
    }
}

/// MPEG-4 sampling frequency index, or None for unlisted rates.
fn sampling_frequency_index(sample_rate: u32) -> Option<u8> {
    const RATES: [u32; 12] = [
        96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
        8_000,
    ];
    RATES
        .iter()
        .position(|&r| r == sample_rate)
        .map(|i| u8::try_from(i).unwrap_or(0x0F))
}

/// Prebuilt ADTS header fields for one stream configuration.
#[derive(Debug, Clone, Copy)]
pub struct AdtsHeader {
    profile: u8,
    sampling_frequency_index: u8,
    channel_configuration: u8,
}

impl AdtsHeader {
    /// Header size (no CRC)
    pub const SIZE: usize = 7;

    /// Build a header template.
    ///
    /// # Errors
    /// Returns `CodecError::UnsupportedObjectType` for object types the
    /// 2-bit profile field cannot carry, and `Configuration` for sample
    /// rates outside the MPEG-4 frequency table.
    pub fn new(
        object_type: AacObjectType,
        sample_rate: u32,
        channels: u8,
    ) -> Result<Self, CodecError> {
        let aot = object_type.aot();
        if !(1..=4).contains(&aot) {
            return Err(CodecError::UnsupportedObjectType(object_type));
        }

        let sampling_frequency_index = sampling_frequency_index(sample_rate).ok_or_else(|| {
            CodecError::Configuration(format!("sample rate {sample_rate} not in ADTS table"))
        })?;

        Ok(Self {
            profile: aot - 1,
            sampling_frequency_index,
            channel_configuration: channels & 0x07,
        })
    }

    /// Wrap one raw AAC frame in an ADTS header.
    #[must_use]
    pub fn wrap(&self, payload: &[u8]) -> Bytes {
        let frame_length = (payload.len() + Self::SIZE) as u16 & 0x1FFF;
        let mut buf = BytesMut::with_capacity(Self::SIZE + payload.len());

        // Syncword (12 bits), MPEG-4 (1 bit = 0), layer (2 bits = 0),
        // protection absent (1 bit = 1)
        buf.put_u16(0xFFF0 | 0x0001);

        // Profile (2), sampling frequency index (4), private (1),
        // channel configuration high bit (1)
        buf.put_u8(
            (self.profile << 6)
                | (self.sampling_frequency_index << 2)
                | (self.channel_configuration >> 2),
        );

        // Channel configuration low bits (2), orig/home/copyright (4 = 0),
        // frame length high bits (2)
        buf.put_u8(((self.channel_configuration & 0x03) << 6) | ((frame_length >> 11) as u8));

        // Frame length middle 8 bits
        buf.put_u8((frame_length >> 3) as u8);

        // Frame length low 3 bits, buffer fullness high 5 bits (all ones)
        buf.put_u8((((frame_length & 0x07) as u8) << 5) | 0x1F);

        // Buffer fullness low 6 bits (all ones), frames-minus-one (2 = 0)
        buf.put_u8(0xFC);

        buf.put_slice(payload);
        buf.freeze()
    }
}
