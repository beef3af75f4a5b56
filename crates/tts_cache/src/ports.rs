//! Port definitions for text-to-speech conversion
//!
//! Defines the trait (port) that speech backends and the caching layer implement.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::error::SpeechError;
use crate::types::{AudioAsset, ConversionRequest};

/// Port for text-to-speech backends
///
/// A backend is created unconfigured by the registry, receives the host's
/// configuration through [`SpeechBackend::configure`], and is then shared
/// read-only between concurrent conversions.
///
/// # Example
///
/// ```ignore
/// use tts_cache::{ConversionRequest, SpeechBackend};
///
/// async fn speak(backend: &dyn SpeechBackend) -> Result<usize, SpeechError> {
///     let request = ConversionRequest::new("google", "en", "neutral", "Hello");
///     let asset = backend.convert(&request).await?;
///     Ok(asset.frames())
/// }
/// ```
#[async_trait]
pub trait SpeechBackend: Send + Sync + Debug {
    /// Name this backend is registered under
    fn provider_id(&self) -> &str;

    /// Apply the host configuration
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if required settings are missing.
    fn configure(&mut self, config: &TtsConfig) -> Result<(), SpeechError>;

    /// Convert the request's text into decoded audio
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the conversion fails. Implementations never
    /// return an empty asset as success.
    async fn convert(&self, request: &ConversionRequest) -> Result<AudioAsset, SpeechError>;

    /// Check if the backend can currently serve requests
    async fn is_available(&self) -> bool {
        true
    }
}
