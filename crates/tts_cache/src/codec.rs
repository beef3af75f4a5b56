//! WAV encoding and decoding for cached and synthesized audio
//!
//! Cache entries are 16-bit PCM WAV files. Decoding accepts any integer or
//! float WAV `hound` can read, plus headerless 16-bit little-endian PCM as
//! written by native engines.
//!
//! WAV written to a pipe (FFmpeg `pipe:1`) cannot have its size fields
//! patched after the fact and carries `0xFFFFFFFF` or `0` placeholders.
//! Those sizes are rebuilt from the buffer length before decoding.

use std::borrow::Cow;
use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::SpeechError;
use crate::types::AudioAsset;

/// Bits per sample written to cache files
const CACHE_BITS_PER_SAMPLE: u16 = 16;

/// Size placeholder written by encoders that cannot seek
const STREAMED_SIZE: u32 = u32::MAX;

/// Encode an asset as a 16-bit PCM WAV file
pub fn encode_wav(asset: &AudioAsset) -> Result<Vec<u8>, SpeechError> {
    if asset.channel_count() == 0 || asset.sample_rate() == 0 {
        return Err(SpeechError::DecodeFailed(format!(
            "cannot encode audio with {} channels at {} Hz",
            asset.channel_count(),
            asset.sample_rate()
        )));
    }

    let spec = WavSpec {
        channels: asset.channel_count(),
        sample_rate: asset.sample_rate(),
        bits_per_sample: CACHE_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + asset.samples().len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in asset.samples() {
            writer.write_sample(float_to_i16(sample))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Decode WAV bytes into an asset
///
/// # Errors
///
/// Returns `SpeechError::DecodeFailed` for malformed, truncated, or empty audio.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioAsset, SpeechError> {
    let bytes = repair_streamed_sizes(bytes);
    let reader = WavReader::new(Cursor::new(bytes.as_ref()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(SpeechError::DecodeFailed(format!(
                    "unsupported bit depth {}",
                    spec.bits_per_sample
                )));
            }
            #[allow(clippy::cast_precision_loss)]
            let scale = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        },
    };

    if samples.is_empty() {
        return Err(SpeechError::DecodeFailed(
            "audio contains no samples".to_string(),
        ));
    }

    Ok(AudioAsset::new(samples, spec.sample_rate, spec.channels))
}

/// Decode headerless 16-bit little-endian PCM
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16_le(
    bytes: &[u8],
    sample_rate: u32,
    channel_count: u16,
) -> Result<AudioAsset, SpeechError> {
    if bytes.len() < 2 {
        return Err(SpeechError::DecodeFailed(
            "raw PCM buffer contains no samples".to_string(),
        ));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / f32::from(i16::MAX))
        .collect();

    Ok(AudioAsset::new(samples, sample_rate, channel_count))
}

/// Replace placeholder RIFF and `data` sizes with the real ones
///
/// Only placeholder sizes are touched, so a genuinely truncated file still
/// fails to decode.
fn repair_streamed_sizes(bytes: &[u8]) -> Cow<'_, [u8]> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Cow::Borrowed(bytes);
    }

    let mut pos: usize = 12;
    let mut block_align: usize = 1;
    while let Some(header) = pos.checked_add(8).and_then(|end| bytes.get(pos..end)) {
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let body = pos + 8;

        if &header[0..4] == b"fmt " {
            if let Some(align) = bytes.get(body + 12..body + 14) {
                block_align = usize::from(u16::from_le_bytes([align[0], align[1]])).max(1);
            }
        }

        if &header[0..4] == b"data" {
            let available = bytes.len() - body;
            if size != STREAMED_SIZE && !(size == 0 && available > 0) {
                return Cow::Borrowed(bytes);
            }
            let data_len = available - available % block_align;
            let (Ok(data_size), Ok(riff_size)) =
                (u32::try_from(data_len), u32::try_from(body + data_len - 8))
            else {
                return Cow::Borrowed(bytes);
            };

            let mut repaired = bytes[..body + data_len].to_vec();
            repaired[4..8].copy_from_slice(&riff_size.to_le_bytes());
            repaired[pos + 4..pos + 8].copy_from_slice(&data_size.to_le_bytes());
            return Cow::Owned(repaired);
        }

        // Chunks are padded to even length
        let Ok(size) = usize::try_from(size) else {
            break;
        };
        pos = body.saturating_add(size).saturating_add(size % 2);
    }

    Cow::Borrowed(bytes)
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}
