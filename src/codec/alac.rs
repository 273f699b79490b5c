//! ALAC decoding through symphonia
//!
//! The stream never ships an ALAC magic cookie; the sender's parameters are
//! fixed by the announcement, so an equivalent cookie is synthesized from
//! the decoder configuration and handed to symphonia as codec extra data.

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_ALAC, CodecParameters, DecoderOptions};
use symphonia::core::conv::IntoSample;
use symphonia::core::formats::Packet;

use super::{AudioDecoder, CodecError, DecoderConfig};

/// ALAC tuning constants carried in every cookie the ecosystem emits for
/// this stream shape.
const ALAC_PB: u8 = 40;
const ALAC_MB: u8 = 10;
const ALAC_KB: u8 = 14;
const ALAC_MAX_RUN: u16 = 255;

/// Synthesize a 24-byte ALACSpecificConfig.
fn magic_cookie(config: &DecoderConfig) -> Vec<u8> {
    let mut cookie = BytesMut::with_capacity(24);
    cookie.put_u32(config.frame_length);
    cookie.put_u8(0); // compatible version
    cookie.put_u8(config.bit_depth);
    cookie.put_u8(ALAC_PB);
    cookie.put_u8(ALAC_MB);
    cookie.put_u8(ALAC_KB);
    cookie.put_u8(config.channels);
    cookie.put_u16(ALAC_MAX_RUN);
    cookie.put_u32(0); // max frame bytes (unknown)
    cookie.put_u32(0); // average bit rate (unknown)
    cookie.put_u32(config.sample_rate);
    cookie.to_vec()
}

/// ALAC decoder backed by symphonia, fed packet by packet.
pub struct AlacDecoder {
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    config: DecoderConfig,
    out: Vec<u8>,
}

impl AlacDecoder {
    /// Configure a decoder for the session's stream shape.
    ///
    /// # Errors
    /// Returns `CodecError::Configuration` if symphonia rejects the
    /// synthesized parameters.
    pub fn new(config: DecoderConfig) -> Result<Self, CodecError> {
        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_ALAC)
            .with_sample_rate(config.sample_rate)
            .with_extra_data(magic_cookie(&config).into_boxed_slice());

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| CodecError::Configuration(e.to_string()))?;

        Ok(Self {
            decoder,
            config,
            out: vec![0u8; config.output_size()],
        })
    }
}

#[async_trait]
impl AudioDecoder for AlacDecoder {
    fn config(&self) -> DecoderConfig {
        self.config
    }

    async fn decode(&mut self, input: &[u8]) -> Result<&[u8], CodecError> {
        let packet = Packet::new_from_slice(0, 0, u64::from(self.config.frame_length), input);
        let decoded = self
            .decoder
            .decode(&packet)
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        let output_size = self.config.output_size();
        self.out.clear();

        let spec = *decoded.spec();
        let channels = spec.channels.count();

        // Interleave planar channels into signed-16 little-endian frames.
        macro_rules! interleave {
            ($buf:expr) => {
                for frame in 0..$buf.frames() {
                    for channel in 0..channels {
                        if self.out.len() + 2 > output_size {
                            break;
                        }
                        let sample: i16 = $buf.chan(channel)[frame].into_sample();
                        self.out.extend_from_slice(&sample.to_le_bytes());
                    }
                }
            };
        }

        match decoded {
            AudioBufferRef::S16(buf) => interleave!(buf),
            AudioBufferRef::S32(buf) => interleave!(buf),
            AudioBufferRef::F32(buf) => interleave!(buf),
            other => {
                return Err(CodecError::Decode(format!(
                    "unsupported decoded sample format: {:?}",
                    other.spec()
                )));
            }
        }

        self.out.resize(output_size, 0);
        Ok(&self.out)
    }
}
