//! Native Text-to-Speech Backend
//!
//! Implements `SpeechBackend` on top of a locally installed speech engine.
//! The engine call blocks, so it runs on tokio's blocking pool and never on
//! the caller's task.
//!
//! The engine writes its output to a transient file in a per-job directory
//! below `native.work_dir/{cache_directory_name}`. The job directory, and
//! every parent created for it that ends up empty, is removed after
//! decoding, whether synthesis succeeded or not.
//!
//! # Voice selection
//!
//! `language` must be a two-letter ISO 639-1 code, optionally with a region
//! (`de`, `de-DE`, `de_DE`). `voice` must be `male`, `female` or `neutral`.
//! Anything else falls back to `en` / `neutral` with a warning.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cache_key::cache_key_for;
use crate::codec;
use crate::config::TtsConfig;
use crate::error::SpeechError;
use crate::ports::SpeechBackend;
use crate::types::{AudioAsset, AudioFormat, ConversionRequest, VoiceGender};

/// Provider name of the native backend
pub const NATIVE_PROVIDER: &str = "native";

/// Language used when the configured one is not understood
pub const DEFAULT_LANGUAGE: &str = "en";

/// One synthesis call handed to a [`SpeechEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisJob {
    /// Text to speak
    pub text: String,
    /// Two-letter ISO 639-1 language code
    pub language: String,
    /// Preferred voice gender
    pub gender: VoiceGender,
    /// Sample rate expected for raw output
    pub sample_rate: u32,
    /// Channel count expected for raw output
    pub channels: u16,
}

/// A blocking, locally installed speech synthesizer
///
/// `synthesize` writes either a WAV file or headerless 16-bit little-endian
/// PCM (at the job's sample rate and channel count) to `output`.
pub trait SpeechEngine: Send + Sync + Debug {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Synthesize `job` into the file at `output`
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::NotAvailable` if the engine is not installed and
    /// `SpeechError::EngineFailed` if it fails.
    fn synthesize(&self, job: &SynthesisJob, output: &Path) -> Result<(), SpeechError>;

    /// Check if the engine can be invoked
    fn is_available(&self) -> bool;
}

/// espeak-ng command line engine
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    executable: PathBuf,
}

impl EspeakEngine {
    /// Create an engine invoking `executable`
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// espeak-ng voice name for a job, e.g. `de+f3`
    fn voice_arg(job: &SynthesisJob) -> String {
        match job.gender {
            VoiceGender::Male => format!("{}+m3", job.language),
            VoiceGender::Female => format!("{}+f3", job.language),
            VoiceGender::Neutral => job.language.clone(),
        }
    }
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    fn synthesize(&self, job: &SynthesisJob, output: &Path) -> Result<(), SpeechError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-v")
            .arg(Self::voice_arg(job))
            .arg("-w")
            .arg(output)
            .arg("--")
            .arg(&job.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(command = ?cmd, "Running espeak-ng");

        let result = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpeechError::NotAvailable(format!(
                    "espeak-ng not found at '{}'",
                    self.executable.display()
                ))
            } else {
                SpeechError::EngineFailed(format!("Failed to run espeak-ng: {e}"))
            }
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SpeechError::EngineFailed(format!(
                "espeak-ng exited with status {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }
}

/// Settings taken from the configuration
#[derive(Debug, Clone)]
struct NativeSettings {
    work_dir: PathBuf,
    sample_rate: u32,
    channels: u16,
    trim_start: usize,
    trim_end: usize,
}

/// Text-to-speech backend driving a local [`SpeechEngine`]
#[derive(Debug, Clone)]
pub struct NativeSynthesisBackend {
    engine: Option<Arc<dyn SpeechEngine>>,
    settings: Option<NativeSettings>,
}

impl NativeSynthesisBackend {
    /// Create an unconfigured backend.
    ///
    /// Unless an engine is supplied, `configure` installs an [`EspeakEngine`]
    /// for `native.executable_path`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            engine: None,
            settings: None,
        }
    }

    /// Create a backend around a specific engine
    #[must_use]
    pub fn with_engine(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine: Some(engine),
            settings: None,
        }
    }

    fn parts(&self) -> Result<(Arc<dyn SpeechEngine>, NativeSettings), SpeechError> {
        match (&self.engine, &self.settings) {
            (Some(engine), Some(settings)) => Ok((Arc::clone(engine), settings.clone())),
            _ => Err(SpeechError::Configuration(format!(
                "Provider '{NATIVE_PROVIDER}' used before configure()"
            ))),
        }
    }

    /// Run one job to completion on the current (blocking) thread
    fn run_blocking(
        engine: &dyn SpeechEngine,
        settings: &NativeSettings,
        job: &SynthesisJob,
        file_name: &str,
    ) -> Result<AudioAsset, SpeechError> {
        let transient = TransientFile::create(&settings.work_dir, file_name)?;

        let result = engine
            .synthesize(job, transient.path())
            .and_then(|()| {
                std::fs::read(transient.path()).map_err(|e| {
                    SpeechError::EngineFailed(format!("Failed to read engine output: {e}"))
                })
            })
            .and_then(|bytes| decode_engine_output(&bytes, settings))
            .and_then(|asset| trim_artifacts(&asset, settings.trim_start, settings.trim_end));

        transient.remove();
        result
    }
}

impl Default for NativeSynthesisBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechBackend for NativeSynthesisBackend {
    fn provider_id(&self) -> &str {
        NATIVE_PROVIDER
    }

    fn configure(&mut self, config: &TtsConfig) -> Result<(), SpeechError> {
        config.validate().map_err(SpeechError::Configuration)?;

        if self.engine.is_none() {
            self.engine = Some(Arc::new(EspeakEngine::new(&config.native.executable_path)));
        }

        self.settings = Some(NativeSettings {
            work_dir: config.native.work_dir.join(&config.cache_directory_name),
            sample_rate: config.native.sample_rate,
            channels: config.native.channels,
            trim_start: config.native.trim_start_samples,
            trim_end: config.native.trim_end_samples,
        });

        Ok(())
    }

    #[instrument(skip(self, request), fields(text_len = request.text.len(), language = %request.language))]
    async fn convert(&self, request: &ConversionRequest) -> Result<AudioAsset, SpeechError> {
        if request.text.trim().is_empty() {
            return Err(SpeechError::Configuration(
                "Cannot convert empty text".to_string(),
            ));
        }

        let (engine, settings) = self.parts()?;

        let language = normalize_language(&request.language).unwrap_or_else(|| {
            warn!(
                "The language \"{}\" is not valid. It was changed to default: \"{DEFAULT_LANGUAGE}\".",
                request.language
            );
            DEFAULT_LANGUAGE.to_string()
        });

        let gender = VoiceGender::parse(&request.voice).unwrap_or_else(|| {
            warn!(
                "The voice \"{}\" is not valid. It was changed to default: \"neutral\".",
                request.voice
            );
            VoiceGender::Neutral
        });

        let job = SynthesisJob {
            text: request.text.clone(),
            language,
            gender,
            sample_rate: settings.sample_rate,
            channels: settings.channels,
        };
        let file_name = format!("{}{}", Uuid::new_v4().simple(), cache_key_for(request));

        debug!(engine = engine.name(), "Dispatching native synthesis");

        let asset = tokio::task::spawn_blocking(move || {
            Self::run_blocking(engine.as_ref(), &settings, &job, &file_name)
        })
        .await
        .map_err(|e| SpeechError::EngineFailed(format!("Synthesis task failed: {e}")))??;

        debug!(frames = asset.frames(), "Native synthesis complete");

        Ok(asset)
    }

    async fn is_available(&self) -> bool {
        let Some(engine) = self.engine.clone() else {
            return false;
        };
        tokio::task::spawn_blocking(move || engine.is_available())
            .await
            .unwrap_or(false)
    }
}

/// Reduce `de`, `de-DE` or `de_DE` to `de`
pub fn normalize_language(language: &str) -> Option<String> {
    let mut parts = language.trim().split(['-', '_']);
    let primary = parts.next()?;
    if primary.len() != 2 || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    match (parts.next(), parts.next()) {
        (None, None) => {},
        (Some(region), None)
            if (region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()))
                || (region.len() == 3 && region.chars().all(|c| c.is_ascii_digit())) => {},
        _ => return None,
    }

    Some(primary.to_ascii_lowercase())
}

fn decode_engine_output(bytes: &[u8], settings: &NativeSettings) -> Result<AudioAsset, SpeechError> {
    if bytes.is_empty() {
        return Err(SpeechError::EngineFailed(
            "Engine produced empty output".to_string(),
        ));
    }

    if AudioFormat::sniff(bytes) == Some(AudioFormat::Wav) {
        codec::decode_wav(bytes)
    } else {
        codec::decode_pcm16_le(bytes, settings.sample_rate, settings.channels)
    }
}

/// Drop engine start-up and tear-down artifacts
///
/// Trim counts are rounded down to whole frames.
fn trim_artifacts(asset: &AudioAsset, start: usize, end: usize) -> Result<AudioAsset, SpeechError> {
    let channels = usize::from(asset.channel_count().max(1));
    let start = start - start % channels;
    let end = end - end % channels;
    let samples = asset.samples();

    if samples.len() <= start.saturating_add(end) {
        return Err(SpeechError::EngineFailed(format!(
            "Engine produced {} samples, not more than the {} trimmed",
            samples.len(),
            start + end
        )));
    }

    Ok(AudioAsset::new(
        samples[start..samples.len() - end].to_vec(),
        asset.sample_rate(),
        asset.channel_count(),
    ))
}

/// Tries at creating a job directory while another job removes its parent
const CREATE_ATTEMPTS: usize = 3;

/// Engine output file in a directory of its own, plus the parents created
/// to hold it
#[derive(Debug)]
struct TransientFile {
    job_dir: TempDir,
    path: PathBuf,
    created_dirs: Vec<PathBuf>,
}

impl TransientFile {
    fn create(dir: &Path, file_name: &str) -> Result<Self, SpeechError> {
        // Directories that do not exist yet, deepest first
        let created_dirs: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|d| !d.as_os_str().is_empty() && !d.exists())
            .map(Path::to_path_buf)
            .collect();

        let mut attempt = 0;
        let job_dir = loop {
            attempt += 1;
            let created = std::fs::create_dir_all(dir)
                .and_then(|()| tempfile::Builder::new().prefix("job-").tempdir_in(dir));
            match created {
                Ok(job_dir) => break job_dir,
                // A finished job removed the empty parent in between
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && attempt < CREATE_ATTEMPTS => {},
                Err(e) => {
                    return Err(SpeechError::EngineFailed(format!(
                        "Failed to create work directory in '{}': {e}",
                        dir.display()
                    )));
                },
            }
        };

        Ok(Self {
            path: job_dir.path().join(file_name),
            job_dir,
            created_dirs,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn remove(self) {
        let job_path = self.job_dir.path().to_path_buf();
        if let Err(e) = self.job_dir.close() {
            warn!(path = %job_path.display(), "Failed to remove transient directory: {e}");
        }

        for dir in &self.created_dirs {
            // Fails while other jobs still use it
            if std::fs::remove_dir(dir).is_err() {
                break;
            }
        }
    }
}
