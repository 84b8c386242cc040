//! WAV container helpers for 16-bit PCM takes.
//!
//! The header goes out first with zero sizes, PCM streams after it, and the
//! sizes are patched once the whole payload has been assembled.

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

pub const WAV_MIME_TYPE: &str = "audio/wav";

/// PCM layout written into the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavSpec {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            bits_per_sample: 16,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Build the 44-byte RIFF header.
    ///
    /// ```text
    /// [0-3]    "RIFF"        [4-7]   36 + data_size
    /// [8-11]   "WAVE"        [12-15] "fmt "
    /// [16-19]  16            [20-21] 1 (PCM)
    /// [22-23]  channels      [24-27] sample_rate
    /// [28-31]  byte_rate     [32-33] block_align
    /// [34-35]  bits          [36-39] "data"
    /// [40-43]  data_size
    /// ```
    pub fn header(&self, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_size.to_le_bytes());

        header
    }
}

/// Patch the RIFF and data sizes of an assembled payload in place.
///
/// Returns `false` (leaving the bytes untouched) if the payload does not
/// start with a RIFF/WAVE header.
pub fn seal(payload: &mut [u8]) -> bool {
    if payload.len() < WAV_HEADER_SIZE || &payload[0..4] != b"RIFF" || &payload[8..12] != b"WAVE" {
        return false;
    }
    let data_size = (payload.len() - WAV_HEADER_SIZE) as u32;
    payload[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    payload[40..44].copy_from_slice(&data_size.to_le_bytes());
    true
}

/// Convert f32 samples in `[-1.0, 1.0]` to little-endian 16-bit PCM.
///
/// Out-of-range values are clamped.
pub fn encode_pcm16(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    #[test]
    fn header_layout_mono_48k() {
        let header = WavSpec::pcm16(48000, 1).header(9600);

        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(read_u16(&header, 20), 1);
        assert_eq!(read_u16(&header, 22), 1);
        assert_eq!(read_u32(&header, 24), 48000);
        assert_eq!(read_u32(&header, 28), 96000);
        assert_eq!(read_u16(&header, 32), 2);
        assert_eq!(read_u16(&header, 34), 16);
        assert_eq!(read_u32(&header, 40), 9600);
        assert_eq!(read_u32(&header, 4), 36 + 9600);
    }

    #[test]
    fn zero_channels_treated_as_mono() {
        assert_eq!(WavSpec::pcm16(16000, 0).channels, 1);
    }

    #[test]
    fn seal_patches_sizes_from_payload_length() {
        let mut payload = WavSpec::pcm16(44100, 2).header(0).to_vec();
        payload.extend_from_slice(&[0u8; 400]);

        assert!(seal(&mut payload));
        assert_eq!(read_u32(&payload, 40), 400);
        assert_eq!(read_u32(&payload, 4), 436);
    }

    #[test]
    fn seal_ignores_foreign_payloads() {
        let mut payload = vec![7u8; 64];
        assert!(!seal(&mut payload));
        assert_eq!(payload, vec![7u8; 64]);
    }

    #[test]
    fn pcm16_clamps_and_scales() {
        let mut out = Vec::new();
        encode_pcm16(&[0.0, 1.0, -1.0, 2.0], &mut out);
        assert_eq!(out.len(), 8);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), 0);
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([out[4], out[5]]), -i16::MAX);
        assert_eq!(i16::from_le_bytes([out[6], out[7]]), i16::MAX);
    }
}
