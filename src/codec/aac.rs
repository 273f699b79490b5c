//! AAC decoding through libfdk-aac

use async_trait::async_trait;
use fdk_aac::dec::{Decoder, Transport};

use super::adts::{AacObjectType, AdtsHeader};
use super::{AudioDecoder, CodecError, DecoderConfig};

/// AAC decoder for raw frames, driven through the FDK ADTS transport.
///
/// The decoder is stateful across frames, so one instance serves the whole
/// session and calls are serialized by the session's decoder mutex.
pub struct FdkAacDecoder {
    decoder: Decoder,
    adts: AdtsHeader,
    config: DecoderConfig,
    pcm: Vec<i16>,
    out: Vec<u8>,
}

impl FdkAacDecoder {
    /// Configure a decoder for the given object type.
    ///
    /// # Errors
    /// Returns `CodecError::UnsupportedObjectType` when the transport cannot
    /// signal the object type (the ELD path ends up here and falls through
    /// to the next factory), or `Configuration` when libfdk rejects the
    /// channel setup.
    pub fn new(config: DecoderConfig, object_type: AacObjectType) -> Result<Self, CodecError> {
        let adts = AdtsHeader::new(object_type, config.sample_rate, config.channels)?;

        let mut decoder = Decoder::new(Transport::Adts);
        decoder
            .set_min_output_channels(config.channels.into())
            .map_err(|e| CodecError::Configuration(format!("min channels: {e:?}")))?;
        decoder
            .set_max_output_channels(config.channels.into())
            .map_err(|e| CodecError::Configuration(format!("max channels: {e:?}")))?;

        // Scratch sized generously; libfdk reports the real frame size after
        // the first decode.
        let scratch_samples = 2048 * usize::from(config.channels);

        Ok(Self {
            decoder,
            adts,
            config,
            pcm: vec![0i16; scratch_samples],
            out: vec![0u8; config.output_size()],
        })
    }
}

#[async_trait]
impl AudioDecoder for FdkAacDecoder {
    fn config(&self) -> DecoderConfig {
        self.config
    }

    async fn decode(&mut self, input: &[u8]) -> Result<&[u8], CodecError> {
        let framed = self.adts.wrap(input);

        let consumed = self
            .decoder
            .fill(&framed)
            .map_err(|e| CodecError::Decode(format!("fill: {e:?}")))?;
        if consumed < framed.len() {
            return Err(CodecError::Decode(format!(
                "decoder consumed {consumed} of {} bytes",
                framed.len()
            )));
        }

        self.decoder
            .decode_frame(&mut self.pcm)
            .map_err(|e| CodecError::Decode(format!("frame: {e:?}")))?;

        let decoded_samples = self.decoder.decoded_frame_size().min(self.pcm.len());

        // Fixed-size output; a short decode is padded with silence and an
        // overlong one truncated so the buffer slots stay uniform.
        let output_size = self.config.output_size();
        self.out.clear();
        for &sample in &self.pcm[..decoded_samples] {
            if self.out.len() + 2 > output_size {
                break;
            }
            self.out.extend_from_slice(&sample.to_le_bytes());
        }
        self.out.resize(output_size, 0);

        Ok(&self.out)
    }
}
