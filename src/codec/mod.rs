//! Codec dispatch
//!
//! One decoder per session, selected once from the advertised format. All
//! decoders speak the same narrow contract: a fixed output size per frame
//! and a `decode` that turns one payload into interleaved signed-16 PCM.
//! Decode failures do not drop frames; the caller substitutes silence of
//! `output_size` bytes so the timestamp cadence survives.

mod aac;
mod adts;
mod alac;
mod eld;
mod latm;
mod pcm;


pub use aac::FdkAacDecoder;
pub use adts::{AacObjectType, AdtsHeader};
pub use alac::AlacDecoder;
pub use eld::EldPipeDecoder;
pub use pcm::PcmDecoder;

use async_trait::async_trait;

use crate::session::{AudioFormat, StreamSession};

/// Fixed stream sample rate.
pub const SAMPLE_RATE: u32 = 44_100;

/// Stereo
pub const CHANNELS: u8 = 2;

/// 16-bit samples
pub const BIT_DEPTH: u8 = 16;

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The transport framing cannot represent this object type
    #[error("unsupported AAC object type: {0:?}")]
    UnsupportedObjectType(AacObjectType),

    /// Decoder construction or configuration failed
    #[error("decoder configuration failed: {0}")]
    Configuration(String),

    /// A frame failed to decode
    #[error("decode failed: {0}")]
    Decode(String),

    /// The out-of-process decoder could not be spawned or died
    #[error("decoder process error: {0}")]
    Process(#[from] std::io::Error),
}

/// Parameters a decoder is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u8,
    /// Bits per sample
    pub bit_depth: u8,
    /// Samples per channel per frame
    pub frame_length: u32,
}

impl DecoderConfig {
    /// Bytes in one decoded frame:
    /// `frame_length * channels * bit_depth / 8`.
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.frame_length as usize * usize::from(self.channels) * usize::from(self.bit_depth) / 8
    }
}

/// Uniform decode interface.
///
/// Decoding is async so the out-of-process variant can drive its child's
/// pipes without stalling the runtime; the in-process decoders finish a
/// frame's worth of CPU work without suspending.
#[async_trait]
pub trait AudioDecoder: Send {
    /// The configuration the decoder was built with.
    fn config(&self) -> DecoderConfig;

    /// Bytes per decoded frame.
    fn output_size(&self) -> usize {
        self.config().output_size()
    }

    /// Decode one payload into interleaved signed-16 little-endian PCM.
    ///
    /// The returned slice borrows the decoder's scratch buffer and is valid
    /// until the next call.
    ///
    /// # Errors
    /// Returns `CodecError` if the payload does not decode; the caller
    /// substitutes silence and keeps the frame.
    async fn decode(&mut self, input: &[u8]) -> Result<&[u8], CodecError>;
}

/// Select and configure the session's decoder from its advertised format.
///
/// Called once per session under the decoder mutex. The AAC-ELD fallback
/// order is a declarative factory list; the first factory that configures
/// successfully wins.
///
/// # Errors
/// Returns the last factory error if no decoder for the format could be
/// configured.
pub fn select_decoder(
    session: &StreamSession,
    eld_decoder_command: &[String],
) -> Result<Box<dyn AudioDecoder>, CodecError> {
    let config_for = |frame_default: u32| DecoderConfig {
        sample_rate: SAMPLE_RATE,
        channels: CHANNELS,
        bit_depth: BIT_DEPTH,
        frame_length: session.frame_length_or(frame_default),
    };

    let format = match session.format {
        AudioFormat::Unknown => {
            if session.compression_type == 1 {
                AudioFormat::Alac
            } else {
                AudioFormat::Pcm
            }
        }
        other => other,
    };

    match format {
        AudioFormat::Alac => {
            let decoder = AlacDecoder::new(config_for(352))?;
            Ok(Box::new(decoder))
        }
        AudioFormat::Aac => {
            let decoder = FdkAacDecoder::new(config_for(1024), AacObjectType::Main)?;
            Ok(Box::new(decoder))
        }
        AudioFormat::AacEld => select_eld_decoder(config_for(480), eld_decoder_command),
        AudioFormat::Pcm | AudioFormat::Unknown => {
            Ok(Box::new(PcmDecoder::new(config_for(352))))
        }
    }
}

/// The AAC-ELD fallback chain: native FDK, then the out-of-process LATM
/// decoder, then plain AAC-LC of identical config.
fn select_eld_decoder(
    config: DecoderConfig,
    command: &[String],
) -> Result<Box<dyn AudioDecoder>, CodecError> {
    type Factory<'a> = Box<dyn Fn() -> Result<Box<dyn AudioDecoder>, CodecError> + 'a>;

    let factories: [(&str, Factory<'_>); 3] = [
        (
            "fdk-eld",
            Box::new(move || {
                FdkAacDecoder::new(config, AacObjectType::Eld)
                    .map(|d| Box::new(d) as Box<dyn AudioDecoder>)
            }),
        ),
        (
            "eld-pipe",
            Box::new(move || {
                EldPipeDecoder::spawn(config, command)
                    .map(|d| Box::new(d) as Box<dyn AudioDecoder>)
            }),
        ),
        (
            "aac-lc",
            Box::new(move || {
                FdkAacDecoder::new(config, AacObjectType::LowComplexity)
                    .map(|d| Box::new(d) as Box<dyn AudioDecoder>)
            }),
        ),
    ];

    let mut last_err = CodecError::Configuration("no decoder factories".into());
    for (name, factory) in factories {
        match factory() {
            Ok(decoder) => {
                tracing::info!("AAC-ELD decoder configured: {name}");
                return Ok(decoder);
            }
            Err(e) => {
                tracing::warn!("AAC-ELD decoder {name} unavailable: {e}");
                last_err = e;
            }
        }
    }
    Err(last_err)
}
