//! Text-to-speech conversion errors

use thiserror::Error;

/// Errors that can occur while converting text to speech
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configured provider name is not registered
    #[error("No matching provider with name '{0}' found")]
    NoMatchingProvider(String),

    /// Failed to connect to the speech service
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Timeout while waiting for the speech service
    #[error("Speech request timed out: {0}")]
    Timeout(String),

    /// The speech service answered, but not with usable audio
    #[error("Download failed{}: {message}", status_suffix(.status))]
    DownloadFailed {
        /// HTTP status code, if the request reached the server
        status: Option<u16>,
        /// Failure description
        message: String,
    },

    /// Bytes could not be decoded into audio
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// The native speech engine failed or produced no output
    #[error("Speech engine failed: {0}")]
    EngineFailed(String),

    /// Backend not available (not installed or configured)
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    /// Cache directory or file could not be accessed
    #[error("Cache error: {0}")]
    Cache(String),

    /// External audio transcoding failed
    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    /// The caller abandoned the conversion
    #[error("Conversion cancelled")]
    Cancelled,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl SpeechError {
    /// Shorthand for a download failure without an HTTP status
    pub fn download(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            status: None,
            message: message.into(),
        }
    }

    /// Whether the error came from the network layer.
    ///
    /// Retrying is left to the caller; this only classifies.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout(_) | Self::DownloadFailed { .. }
        )
    }

    /// Whether the error was raised before any I/O because of bad configuration
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::NoMatchingProvider(_))
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::DownloadFailed {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<hound::Error> for SpeechError {
    fn from(err: hound::Error) -> Self {
        Self::DecodeFailed(err.to_string())
    }
}
