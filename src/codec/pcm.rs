//! PCM passthrough

use async_trait::async_trait;

use super::{AudioDecoder, CodecError, DecoderConfig};

/// Identity decoder for uncompressed streams.
pub struct PcmDecoder {
    config: DecoderConfig,
    out: Vec<u8>,
}

impl PcmDecoder {
    /// Create a passthrough decoder.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            out: Vec::with_capacity(config.output_size()),
        }
    }
}

#[async_trait]
impl AudioDecoder for PcmDecoder {
    fn config(&self) -> DecoderConfig {
        self.config
    }

    async fn decode(&mut self, input: &[u8]) -> Result<&[u8], CodecError> {
        self.out.clear();
        self.out.extend_from_slice(input);
        Ok(&self.out)
    }
}
