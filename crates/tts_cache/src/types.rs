//! Types for text-to-speech conversion
//!
//! Contains the request value, the decoded audio asset, and audio format helpers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::TtsConfig;

/// Encoded audio formats a backend may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// WAV container with PCM samples
    Wav,
    /// MP3 format
    Mp3,
    /// OGG container (Vorbis or Opus)
    Ogg,
    /// FLAC format (lossless)
    Flac,
}

impl AudioFormat {
    /// Get the MIME type for this audio format
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Flac => "audio/flac",
        }
    }

    /// Get the file extension for this audio format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
        }
    }

    /// Parse audio format from a `Content-Type` value
    #[must_use]
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        // Handle compound MIME types like "audio/ogg; codecs=opus"
        let base_mime = mime.split(';').next().unwrap_or(mime).trim();

        match base_mime.to_ascii_lowercase().as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/ogg" | "audio/opus" => Some(Self::Ogg),
            "audio/flac" | "audio/x-flac" => Some(Self::Flac),
            _ => None,
        }
    }

    /// Guess the format from the leading magic bytes
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(Self::Wav),
            [b'I', b'D', b'3', ..] => Some(Self::Mp3),
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(Self::Mp3),
            [b'O', b'g', b'g', b'S', ..] => Some(Self::Ogg),
            [b'f', b'L', b'a', b'C', ..] => Some(Self::Flac),
            _ => None,
        }
    }
}

/// Decoded, in-memory audio
///
/// Samples are interleaved and normalized to `[-1.0, 1.0]`. The buffer is
/// shared, so cloning an asset never copies sample data and no clone can
/// mutate another.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channel_count: u16,
}

impl AudioAsset {
    /// Create a new asset, clamping samples into `[-1.0, 1.0]`
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32, channel_count: u16) -> Self {
        let samples: Vec<f32> = samples
            .into_iter()
            .map(|s| if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 })
            .collect();
        Self {
            samples: samples.into(),
            sample_rate,
            channel_count,
        }
    }

    /// Interleaved samples
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels
    #[must_use]
    pub const fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        if self.channel_count == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channel_count)
    }

    /// Duration in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64).saturating_mul(1000) / u64::from(self.sample_rate)
    }

    /// Check if the asset holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One text-to-speech request
///
/// The tuple `(provider_id, language, voice, text)` is the request's
/// identity for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Text to synthesize
    pub text: String,
    /// Language code, meaning depends on the provider
    pub language: String,
    /// Voice name, meaning depends on the provider
    pub voice: String,
    /// Name of the provider the request is meant for
    pub provider_id: String,
}

impl ConversionRequest {
    /// Create a new request
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        language: impl Into<String>,
        voice: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            voice: voice.into(),
            provider_id: provider_id.into(),
        }
    }

    /// Build a request for `text` using the provider, language and voice of `config`
    #[must_use]
    pub fn from_config(config: &TtsConfig, text: impl Into<String>) -> Self {
        Self::new(
            config.provider.clone(),
            config.language.clone(),
            config.voice.clone(),
            text,
        )
    }
}

/// Voice gender understood by native engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    /// Male voice
    Male,
    /// Female voice
    Female,
    /// Neutral voice
    #[default]
    Neutral,
}

impl VoiceGender {
    /// Parse a configured voice, case-insensitive
    #[must_use]
    pub fn parse(voice: &str) -> Option<Self> {
        match voice.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod audio_format {
        use super::*;

        #[test]
        fn mime_types_are_correct() {
            assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
            assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
            assert_eq!(AudioFormat::Ogg.mime_type(), "audio/ogg");
            assert_eq!(AudioFormat::Flac.mime_type(), "audio/flac");
        }

        #[test]
        fn from_mime_type_simple() {
            assert_eq!(AudioFormat::from_mime_type("audio/wav"), Some(AudioFormat::Wav));
            assert_eq!(AudioFormat::from_mime_type("audio/x-wav"), Some(AudioFormat::Wav));
            assert_eq!(AudioFormat::from_mime_type("audio/mpeg"), Some(AudioFormat::Mp3));
            assert_eq!(AudioFormat::from_mime_type("audio/mp3"), Some(AudioFormat::Mp3));
            assert_eq!(AudioFormat::from_mime_type("audio/flac"), Some(AudioFormat::Flac));
        }

        #[test]
        fn from_mime_type_with_parameters() {
            assert_eq!(
                AudioFormat::from_mime_type("audio/ogg; codecs=opus"),
                Some(AudioFormat::Ogg)
            );
            assert_eq!(
                AudioFormat::from_mime_type("Audio/WAV; charset=binary"),
                Some(AudioFormat::Wav)
            );
        }

        #[test]
        fn from_mime_type_unknown() {
            assert_eq!(AudioFormat::from_mime_type("text/plain"), None);
            assert_eq!(AudioFormat::from_mime_type("application/json"), None);
        }

        #[test]
        fn sniff_recognizes_magic_bytes() {
            assert_eq!(AudioFormat::sniff(b"RIFF\0\0\0\0WAVEfmt "), Some(AudioFormat::Wav));
            assert_eq!(AudioFormat::sniff(b"ID3\x04\0"), Some(AudioFormat::Mp3));
            assert_eq!(AudioFormat::sniff(&[0xFF, 0xFB, 0x90, 0x00]), Some(AudioFormat::Mp3));
            assert_eq!(AudioFormat::sniff(b"OggS\0\x02"), Some(AudioFormat::Ogg));
            assert_eq!(AudioFormat::sniff(b"fLaC\0"), Some(AudioFormat::Flac));
            assert_eq!(AudioFormat::sniff(b"<html>"), None);
            assert_eq!(AudioFormat::sniff(&[]), None);
        }
    }

    mod audio_asset {
        use super::*;

        #[test]
        fn new_keeps_metadata() {
            let asset = AudioAsset::new(vec![0.0; 96], 48_000, 2);
            assert_eq!(asset.sample_rate(), 48_000);
            assert_eq!(asset.channel_count(), 2);
            assert_eq!(asset.samples().len(), 96);
            assert_eq!(asset.frames(), 48);
        }

        #[test]
        fn new_clamps_out_of_range_samples() {
            let asset = AudioAsset::new(vec![1.5, -2.0, f32::NAN, 0.25], 16_000, 1);
            assert_eq!(asset.samples(), &[1.0, -1.0, 0.0, 0.25]);
        }

        #[test]
        fn duration_is_derived_from_frames() {
            let asset = AudioAsset::new(vec![0.0; 48_000], 48_000, 1);
            assert_eq!(asset.duration_ms(), 1000);

            let stereo = AudioAsset::new(vec![0.0; 48_000], 48_000, 2);
            assert_eq!(stereo.duration_ms(), 500);
        }

        #[test]
        fn zero_rate_or_channels_do_not_divide_by_zero() {
            assert_eq!(AudioAsset::new(vec![0.0; 4], 0, 1).duration_ms(), 0);
            assert_eq!(AudioAsset::new(vec![0.0; 4], 8_000, 0).frames(), 0);
        }

        #[test]
        fn clones_share_samples() {
            let asset = AudioAsset::new(vec![0.5; 10], 8_000, 1);
            let clone = asset.clone();
            assert_eq!(asset, clone);
            assert!(std::ptr::eq(asset.samples(), clone.samples()));
        }
    }

    mod conversion_request {
        use super::*;

        #[test]
        fn from_config_copies_identity_fields() {
            let config = TtsConfig {
                provider: "google".to_string(),
                language: "de".to_string(),
                voice: "female".to_string(),
                ..Default::default()
            };

            let request = ConversionRequest::from_config(&config, "Hallo");

            assert_eq!(request.provider_id, "google");
            assert_eq!(request.language, "de");
            assert_eq!(request.voice, "female");
            assert_eq!(request.text, "Hallo");
        }
    }

    mod voice_gender {
        use super::*;

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!(VoiceGender::parse("Male"), Some(VoiceGender::Male));
            assert_eq!(VoiceGender::parse(" FEMALE "), Some(VoiceGender::Female));
            assert_eq!(VoiceGender::parse("neutral"), Some(VoiceGender::Neutral));
            assert_eq!(VoiceGender::parse("robot"), None);
        }

        #[test]
        fn default_is_neutral() {
            assert_eq!(VoiceGender::default(), VoiceGender::Neutral);
        }
    }
}
