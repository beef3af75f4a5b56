//! Web Text-to-Speech Backends
//!
//! Implements `SpeechBackend` for HTTP services that answer a templated GET
//! request with an audio byte stream.
//!
//! # Built-in endpoints
//!
//! | Provider | URL template | Auth |
//! |----------|--------------|------|
//! | `google` | `{base}/speech-api/v1/synthesize?ie=UTF-8&text={text}&lang={language}&sv={voice}&vn=rjs&speed=0.4` | none |
//! | `watson` | `{base}/text-to-speech/api/v1/synthesize?text={text}&voice={language}_{voice}&accept=audio/mp3` | `Authorization` header |
//! | `web`    | `web.url_template` from the configuration | optional |

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, instrument, warn};

use crate::codec;
use crate::config::TtsConfig;
use crate::converter::AudioConverter;
use crate::error::SpeechError;
use crate::ports::SpeechBackend;
use crate::types::{AudioAsset, AudioFormat, ConversionRequest};

/// Provider name of the Google endpoint
pub const GOOGLE_PROVIDER: &str = "google";
/// Provider name of the Watson endpoint
pub const WATSON_PROVIDER: &str = "watson";
/// Provider name of the template-driven endpoint
pub const GENERIC_WEB_PROVIDER: &str = "web";

/// Longest error body echoed into a `DownloadFailed` message
const MAX_ERROR_BODY: usize = 512;

/// Formats offered in the `Accept` header, preferred first
const ACCEPTED_FORMATS: [AudioFormat; 4] = [
    AudioFormat::Wav,
    AudioFormat::Mp3,
    AudioFormat::Ogg,
    AudioFormat::Flac,
];

fn accept_header() -> String {
    ACCEPTED_FORMATS
        .iter()
        .map(AudioFormat::mime_type)
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a web endpoint authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// No credential is sent
    None,
    /// `config.auth_token` is sent verbatim as `Authorization`, if set
    Optional,
    /// `config.auth_token` is sent verbatim as `Authorization` and must be set
    Required,
}

/// Static description of a web endpoint
#[derive(Debug, Clone)]
pub struct WebEndpoint {
    provider_id: String,
    default_base: Option<String>,
    template: Option<String>,
    auth: AuthScheme,
}

impl WebEndpoint {
    /// Google speech API
    #[must_use]
    pub fn google() -> Self {
        Self {
            provider_id: GOOGLE_PROVIDER.to_string(),
            default_base: Some("https://www.google.com".to_string()),
            template: Some(
                "{base}/speech-api/v1/synthesize?ie=UTF-8&text={text}&lang={language}&sv={voice}&vn=rjs&speed=0.4"
                    .to_string(),
            ),
            auth: AuthScheme::None,
        }
    }

    /// IBM Watson text-to-speech API
    #[must_use]
    pub fn watson() -> Self {
        Self {
            provider_id: WATSON_PROVIDER.to_string(),
            default_base: Some("https://stream.watsonplatform.net".to_string()),
            template: Some(
                "{base}/text-to-speech/api/v1/synthesize?text={text}&voice={language}_{voice}&accept=audio/mp3"
                    .to_string(),
            ),
            auth: AuthScheme::Required,
        }
    }

    /// Endpoint whose template comes from `web.url_template`
    #[must_use]
    pub fn generic() -> Self {
        Self {
            provider_id: GENERIC_WEB_PROVIDER.to_string(),
            default_base: None,
            template: None,
            auth: AuthScheme::Optional,
        }
    }
}

/// Settings resolved by `configure`
#[derive(Debug, Clone)]
struct ResolvedEndpoint {
    client: Client,
    template: String,
    base: String,
    auth_token: Option<String>,
}

/// Text-to-speech backend talking to a web API
#[derive(Debug, Clone)]
pub struct WebBackend {
    endpoint: WebEndpoint,
    converter: AudioConverter,
    resolved: Option<ResolvedEndpoint>,
}

impl WebBackend {
    /// Create an unconfigured backend for `endpoint`
    #[must_use]
    pub const fn new(endpoint: WebEndpoint) -> Self {
        Self {
            endpoint,
            converter: AudioConverter::new(),
            resolved: None,
        }
    }

    fn resolved(&self) -> Result<&ResolvedEndpoint, SpeechError> {
        self.resolved.as_ref().ok_or_else(|| {
            SpeechError::Configuration(format!(
                "Provider '{}' used before configure()",
                self.endpoint.provider_id
            ))
        })
    }

    /// Build the download URL for a request
    fn request_url(resolved: &ResolvedEndpoint, request: &ConversionRequest) -> String {
        resolved
            .template
            .replace("{base}", resolved.base.trim_end_matches('/'))
            .replace("{text}", &urlencoding::encode(&request.text))
            .replace("{language}", &urlencoding::encode(&request.language))
            .replace("{voice}", &urlencoding::encode(&request.voice))
    }

    #[instrument(skip(self, request), fields(provider = %self.endpoint.provider_id))]
    async fn download(
        &self,
        request: &ConversionRequest,
    ) -> Result<(Bytes, Option<AudioFormat>), SpeechError> {
        let resolved = self.resolved()?;
        let url = Self::request_url(resolved, request);

        let mut builder = resolved.client.get(&url).header(ACCEPT, accept_header());
        if let Some(token) = &resolved.auth_token {
            builder = builder.header(AUTHORIZATION, token);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate_at_char_boundary(&body, MAX_ERROR_BODY);
            warn!(status = status.as_u16(), "Speech download rejected");
            return Err(SpeechError::DownloadFailed {
                status: Some(status.as_u16()),
                message: format!(
                    "Error while fetching audio from '{}' backend: {}",
                    self.endpoint.provider_id,
                    body.trim()
                ),
            });
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(AudioFormat::from_mime_type);

        let body = response
            .bytes()
            .await
            .map_err(|e| SpeechError::download(format!("Failed to read audio: {e}")))?;

        if body.is_empty() {
            return Err(SpeechError::download(format!(
                "'{}' backend returned an empty body",
                self.endpoint.provider_id
            )));
        }

        debug!(audio_size = body.len(), format = ?declared, "Speech download complete");

        Ok((body, declared))
    }

    /// Decode a downloaded body, transcoding anything that isn't WAV
    async fn decode(&self, body: &[u8], declared: Option<AudioFormat>) -> Result<AudioAsset, SpeechError> {
        // Magic bytes win over a mislabeled Content-Type
        let format = AudioFormat::sniff(body).or(declared);

        let wav = if format == Some(AudioFormat::Wav) {
            body.to_vec()
        } else {
            self.converter
                .to_wav(body, format)
                .await
                .map_err(|e| SpeechError::DecodeFailed(e.to_string()))?
        };

        codec::decode_wav(&wav)
    }
}

fn truncate_at_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl SpeechBackend for WebBackend {
    fn provider_id(&self) -> &str {
        &self.endpoint.provider_id
    }

    fn configure(&mut self, config: &TtsConfig) -> Result<(), SpeechError> {
        let template = self
            .endpoint
            .template
            .clone()
            .or_else(|| config.web.url_template.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                SpeechError::Configuration(format!(
                    "Provider '{}' needs web.url_template",
                    self.endpoint.provider_id
                ))
            })?;

        if !template.contains("{text}") {
            return Err(SpeechError::Configuration(format!(
                "URL template of '{}' has no {{text}} placeholder",
                self.endpoint.provider_id
            )));
        }

        let base = config
            .web
            .base_url
            .clone()
            .or_else(|| self.endpoint.default_base.clone())
            .unwrap_or_default();

        if template.contains("{base}") && base.is_empty() {
            return Err(SpeechError::Configuration(format!(
                "Provider '{}' needs web.base_url",
                self.endpoint.provider_id
            )));
        }

        let auth_token = config.auth_token.clone().filter(|t| !t.trim().is_empty());
        let auth_token = match self.endpoint.auth {
            AuthScheme::None => None,
            AuthScheme::Optional => auth_token,
            AuthScheme::Required => Some(auth_token.ok_or_else(|| {
                SpeechError::Configuration(format!(
                    "Provider '{}' requires auth_token",
                    self.endpoint.provider_id
                ))
            })?),
        };

        if config.timeout_ms == 0 {
            return Err(SpeechError::Configuration(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                SpeechError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        self.converter = config
            .web
            .ffmpeg_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map_or_else(AudioConverter::new, AudioConverter::with_ffmpeg_path);

        self.resolved = Some(ResolvedEndpoint {
            client,
            template,
            base,
            auth_token,
        });

        Ok(())
    }

    #[instrument(skip(self, request), fields(provider = %self.endpoint.provider_id, text_len = request.text.len()))]
    async fn convert(&self, request: &ConversionRequest) -> Result<AudioAsset, SpeechError> {
        if request.text.trim().is_empty() {
            return Err(SpeechError::Configuration(
                "Cannot convert empty text".to_string(),
            ));
        }

        let (body, declared) = self.download(request).await?;
        let asset = self.decode(&body, declared).await?;

        debug!(
            frames = asset.frames(),
            sample_rate = asset.sample_rate(),
            "Web conversion complete"
        );

        Ok(asset)
    }

    async fn is_available(&self) -> bool {
        self.resolved.is_some()
    }
}
