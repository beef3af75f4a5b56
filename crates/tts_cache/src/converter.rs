//! Audio transcoding for compressed backend responses
//!
//! Web backends commonly answer with MP3 or OGG. Those bytes are piped through
//! FFmpeg into 16-bit PCM WAV, which [`crate::codec`] can decode.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::SpeechError;
use crate::types::AudioFormat;

/// Transcodes compressed audio to WAV
///
/// Uses FFmpeg for audio conversion. FFmpeg must be installed on the system.
#[derive(Debug, Clone, Default)]
pub struct AudioConverter {
    /// FFmpeg binary path (defaults to "ffmpeg" in PATH)
    ffmpeg_path: Option<String>,
}

impl AudioConverter {
    /// Create a new audio converter with default settings
    #[must_use]
    pub const fn new() -> Self {
        Self { ffmpeg_path: None }
    }

    /// Create a new audio converter with a custom FFmpeg path
    #[must_use]
    pub fn with_ffmpeg_path(path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: Some(path.into()),
        }
    }

    fn ffmpeg_path(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
    }

    /// Check if FFmpeg is available on the system
    #[instrument(skip(self))]
    pub async fn is_available(&self) -> bool {
        Command::new(self.ffmpeg_path())
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// Transcode `data` to a 16-bit PCM WAV byte stream
    ///
    /// WAV input is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::AudioProcessing` if FFmpeg is missing, fails, or
    /// produces no output.
    #[instrument(skip(self, data), fields(input_format = ?source, input_size = data.len()))]
    pub async fn to_wav(
        &self,
        data: &[u8],
        source: Option<AudioFormat>,
    ) -> Result<Vec<u8>, SpeechError> {
        if source == Some(AudioFormat::Wav) {
            debug!("Audio already WAV, skipping conversion");
            return Ok(data.to_vec());
        }

        let mut cmd = Command::new(self.ffmpeg_path());
        cmd.arg("-loglevel").arg("error");
        if let Some(format) = source {
            cmd.arg("-f").arg(Self::format_to_ffmpeg(format));
        }
        cmd.args(["-i", "pipe:0", "-f", "wav", "-codec:a", "pcm_s16le", "pipe:1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            SpeechError::AudioProcessing(format!(
                "Failed to spawn FFmpeg '{}': {e}",
                self.ffmpeg_path()
            ))
        })?;

        // Feed stdin from a separate task so a full stdout pipe cannot deadlock us
        let writer = child.stdin.take().map(|mut stdin| {
            let input = data.to_vec();
            tokio::spawn(async move {
                let result = stdin.write_all(&input).await;
                drop(stdin);
                result
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SpeechError::AudioProcessing(format!("Failed to wait for FFmpeg: {e}")))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => debug!("FFmpeg closed stdin early: {e}"),
                Err(e) => {
                    return Err(SpeechError::AudioProcessing(format!(
                        "FFmpeg stdin task failed: {e}"
                    )));
                },
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::AudioProcessing(format!(
                "FFmpeg conversion failed: {}",
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(SpeechError::AudioProcessing(
                "FFmpeg produced empty output".to_string(),
            ));
        }

        debug!(output_size = output.stdout.len(), "Conversion successful");

        Ok(output.stdout)
    }

    /// FFmpeg demuxer name for an audio format
    const fn format_to_ffmpeg(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }
}
