//! LOAS/LATM framing for the out-of-process AAC-ELD decoder
//!
//! The external decoder tool consumes an AudioSyncStream: each frame is an
//! 11-bit syncword, a 13-bit byte length, and an AudioMuxElement carrying
//! the mux config (repeated per frame) plus the raw ELD payload.

use bytes::{BufMut, Bytes, BytesMut};

use super::DecoderConfig;

/// MSB-first bit accumulator.
#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    fn put(&mut self, value: u32, bits: u8) {
        debug_assert!(bits <= 32);
        for i in (0..bits).rev() {
            let bit = (value >> i) & 1;
            if self.bit_pos == 0 {
                self.bytes.push(0);
            }
            let last = self.bytes.len() - 1;
            self.bytes[last] |= (bit as u8) << (7 - self.bit_pos);
            self.bit_pos = (self.bit_pos + 1) % 8;
        }
    }

    fn put_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.put(u32::from(b), 8);
        }
    }

    fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// MPEG-4 sampling frequency index with 24-bit escape for unlisted rates.
fn write_sampling_frequency(writer: &mut BitWriter, sample_rate: u32) {
    const RATES: [u32; 12] = [
        96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
        8_000,
    ];
    match RATES.iter().position(|&r| r == sample_rate) {
        Some(index) => writer.put(index as u32, 4),
        None => {
            writer.put(0x0F, 4);
            writer.put(sample_rate, 24);
        }
    }
}

/// AudioSpecificConfig for AAC-ELD (object type 39, escape-coded).
fn write_eld_audio_specific_config(writer: &mut BitWriter, config: &DecoderConfig) {
    writer.put(31, 5); // escape
    writer.put(39 - 32, 6); // ELD
    write_sampling_frequency(writer, config.sample_rate);
    writer.put(u32::from(config.channels), 4);

    // ELDSpecificConfig
    let frame_length_flag = u32::from(config.frame_length == 480);
    writer.put(frame_length_flag, 1); // 0 = 512, 1 = 480 samples
    writer.put(0, 1); // section data resilience
    writer.put(0, 1); // scalefactor data resilience
    writer.put(0, 1); // spectral data resilience
    writer.put(0, 1); // LD SBR absent
    writer.put(0, 4); // ELDEXT_TERM
}

/// StreamMuxConfig for a single program, single layer, one subframe.
fn write_stream_mux_config(writer: &mut BitWriter, config: &DecoderConfig) {
    writer.put(0, 1); // audioMuxVersion
    writer.put(1, 1); // allStreamsSameTimeFraming
    writer.put(0, 6); // numSubFrames
    writer.put(0, 4); // numProgram
    writer.put(0, 3); // numLayer
    write_eld_audio_specific_config(writer, config);
    writer.put(0, 3); // frameLengthType: byte-counted
    writer.put(0xFF, 8); // latmBufferFullness
    writer.put(0, 1); // otherDataPresent
    writer.put(0, 1); // crcCheckPresent
}

/// Frame one raw ELD payload as a LOAS AudioSyncStream element.
#[must_use]
pub fn loas_frame(config: &DecoderConfig, payload: &[u8]) -> Bytes {
    // AudioMuxElement(muxConfigPresent=1)
    let mut mux = BitWriter::default();
    mux.put(0, 1); // useSameStreamMux: config follows
    write_stream_mux_config(&mut mux, config);

    // PayloadLengthInfo: length in bytes, 255-saturated octets
    let mut remaining = payload.len();
    while remaining >= 255 {
        mux.put(255, 8);
        remaining -= 255;
    }
    mux.put(remaining as u32, 8);

    // PayloadMux
    mux.put_bytes(payload);

    let element = mux.finish();

    // AudioSyncStream: syncword + 13-bit length + element
    let mut out = BytesMut::with_capacity(3 + element.len());
    let header: u32 = (0x2B7 << 13) | (element.len() as u32 & 0x1FFF);
    out.put_u8((header >> 16) as u8);
    out.put_u8((header >> 8) as u8);
    out.put_u8(header as u8);
    out.put_slice(&element);
    out.freeze()
}
