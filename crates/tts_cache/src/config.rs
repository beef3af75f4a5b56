//! Configuration for text-to-speech conversion
//!
//! The host application owns a [`TtsConfig`] and hands it to the registry when
//! creating a provider. Nothing in this crate mutates it.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for text-to-speech conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Registered provider name (e.g. "google", "watson", "native")
    #[serde(default)]
    pub provider: String,

    /// Language code, meaning depends on the provider
    #[serde(default = "default_language")]
    pub language: String,

    /// Voice, meaning depends on the provider
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Credential sent to providers that require one
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Serve results from the on-disk cache when present
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Write freshly converted audio into the cache
    #[serde(default)]
    pub persist_results: bool,

    /// Directory the cache directory lives in
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Name of the cache directory below `cache_root`
    #[serde(default = "default_cache_directory_name")]
    pub cache_directory_name: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Web backend settings
    #[serde(default)]
    pub web: WebConfig,

    /// Native engine settings
    #[serde(default)]
    pub native: NativeConfig,
}

/// Settings for HTTP based backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebConfig {
    /// Replaces the scheme and host of the built-in URL templates
    #[serde(default)]
    pub base_url: Option<String>,

    /// URL template for the generic `web` provider.
    ///
    /// Supports `{text}`, `{language}` and `{voice}` placeholders.
    #[serde(default)]
    pub url_template: Option<String>,

    /// FFmpeg binary used to transcode non-WAV responses (default: `ffmpeg` in PATH)
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

/// Settings for the locally installed speech engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Engine executable
    #[serde(default = "default_executable_path")]
    pub executable_path: PathBuf,

    /// Sample rate of raw engine output
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count of raw engine output
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Samples dropped from the start of the synthesized buffer
    #[serde(default = "default_trim_start_samples")]
    pub trim_start_samples: usize,

    /// Samples dropped from the end of the synthesized buffer
    #[serde(default = "default_trim_end_samples")]
    pub trim_end_samples: usize,

    /// Where transient engine output is written
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_voice() -> String {
    "neutral".to_string()
}

const fn default_use_cache() -> bool {
    true
}

fn default_cache_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_cache_directory_name() -> String {
    "TextToSpeech".to_string()
}

const fn default_timeout_ms() -> u64 {
    30000 // 30 seconds
}

fn default_executable_path() -> PathBuf {
    PathBuf::from("espeak-ng")
}

const fn default_sample_rate() -> u32 {
    48_000
}

const fn default_channels() -> u16 {
    1
}

// Tuned against the engine's thread start-up and tear-down clicks.
const fn default_trim_start_samples() -> usize {
    5000
}

const fn default_trim_end_samples() -> usize {
    10000
}

fn default_work_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir)
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            language: default_language(),
            voice: default_voice(),
            auth_token: None,
            use_cache: default_use_cache(),
            persist_results: false,
            cache_root: default_cache_root(),
            cache_directory_name: default_cache_directory_name(),
            timeout_ms: default_timeout_ms(),
            web: WebConfig::default(),
            native: NativeConfig::default(),
        }
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            executable_path: default_executable_path(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            trim_start_samples: default_trim_start_samples(),
            trim_end_samples: default_trim_end_samples(),
            work_dir: default_work_dir(),
        }
    }
}

impl TtsConfig {
    /// Create a config for the given provider with defaults otherwise
    #[must_use]
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Directory holding cache entries
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.cache_directory_name)
    }

    /// Whether a caching layer is needed at all
    #[must_use]
    pub const fn caching_enabled(&self) -> bool {
        self.use_cache || self.persist_results
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.provider.trim().is_empty() {
            return Err("Provider name is required".to_string());
        }

        // Joined onto the cache root and the native work directory alike
        let name = self.cache_directory_name.trim();
        if name.is_empty() {
            if self.caching_enabled() {
                return Err("Cache directory name must not be empty".to_string());
            }
        } else if !is_single_segment(name) {
            return Err(format!(
                "Cache directory name must be a single path segment, got '{name}'"
            ));
        }

        if self.timeout_ms == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        self.native.validate()
    }
}

/// Whether `name` is exactly one plain directory name
fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !name.contains(['/', '\\'])
}

impl NativeConfig {
    /// Validate the native engine settings
    ///
    /// # Errors
    ///
    /// Returns an error if the output format is unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("Native sample rate must be greater than 0".to_string());
        }
        if self.channels == 0 {
            return Err("Native channel count must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = TtsConfig::default();

        assert!(config.provider.is_empty());
        assert_eq!(config.language, "en");
        assert_eq!(config.voice, "neutral");
        assert!(config.auth_token.is_none());
        assert!(config.use_cache);
        assert!(!config.persist_results);
        assert_eq!(config.cache_directory_name, "TextToSpeech");
        assert_eq!(config.timeout_ms, 30000);
        assert!(config.web.base_url.is_none());
        assert!(config.web.ffmpeg_path.is_none());
        assert_eq!(config.native.sample_rate, 48_000);
        assert_eq!(config.native.channels, 1);
        assert_eq!(config.native.trim_start_samples, 5000);
        assert_eq!(config.native.trim_end_samples, 10000);
    }

    #[test]
    fn cache_dir_joins_root_and_name() {
        let config = TtsConfig {
            cache_root: PathBuf::from("/srv/app/assets"),
            cache_directory_name: "Speech".to_string(),
            ..TtsConfig::for_provider("google")
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/srv/app/assets/Speech"));
    }

    #[test]
    fn validate_fails_without_provider() {
        let config = TtsConfig::default();
        assert!(config.validate().is_err());

        let blank = TtsConfig::for_provider("   ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn validate_succeeds_with_provider() {
        assert!(TtsConfig::for_provider("google").validate().is_ok());
    }

    #[test]
    fn validate_fails_with_empty_cache_directory_name() {
        let mut config = TtsConfig::for_provider("google");
        config.cache_directory_name = String::new();
        assert!(config.validate().is_err());

        // Irrelevant when no caching layer is used
        config.use_cache = false;
        config.persist_results = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_fails_with_nested_cache_directory_name() {
        let mut config = TtsConfig::for_provider("google");
        config.cache_directory_name = "a/b".to_string();
        assert!(config.validate().is_err());

        config.cache_directory_name = "..".to_string();
        assert!(config.validate().is_err());

        config.cache_directory_name = ".".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_checks_cache_directory_name_without_caching() {
        let mut config = TtsConfig::for_provider("native");
        config.use_cache = false;
        config.persist_results = false;

        for name in ["../..", "/abs", "a/b", ".."] {
            config.cache_directory_name = name.to_string();
            assert!(config.validate().is_err(), "accepted '{name}'");
        }

        config.cache_directory_name = "Speech".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_fails_with_zero_timeout() {
        let mut config = TtsConfig::for_provider("google");
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_fails_with_zero_native_sample_rate() {
        let mut config = TtsConfig::for_provider("native");
        config.native.sample_rate = 0;
        assert!(config.validate().is_err());

        let mut config = TtsConfig::for_provider("native");
        config.native.channels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn caching_enabled_by_either_flag() {
        let mut config = TtsConfig::for_provider("google");
        config.use_cache = false;
        config.persist_results = false;
        assert!(!config.caching_enabled());

        config.persist_results = true;
        assert!(config.caching_enabled());

        config.persist_results = false;
        config.use_cache = true;
        assert!(config.caching_enabled());
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml = r#"
            provider = "watson"
            language = "de-DE"
            voice = "BirgitVoice"
            auth_token = "Basic abc"
            use_cache = false
            persist_results = true
            cache_root = "/var/cache/app"
            cache_directory_name = "Speech"
            timeout_ms = 60000

            [web]
            base_url = "http://localhost:8080"
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [native]
            executable_path = "/usr/bin/espeak"
            trim_start_samples = 0
            trim_end_samples = 0
        "#;

        let config: TtsConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.provider, "watson");
        assert_eq!(config.language, "de-DE");
        assert_eq!(config.voice, "BirgitVoice");
        assert_eq!(config.auth_token.as_deref(), Some("Basic abc"));
        assert!(!config.use_cache);
        assert!(config.persist_results);
        assert_eq!(config.cache_dir(), PathBuf::from("/var/cache/app/Speech"));
        assert_eq!(config.timeout_ms, 60000);
        assert_eq!(config.web.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.web.ffmpeg_path.as_deref(), Some("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.native.executable_path, PathBuf::from("/usr/bin/espeak"));
        assert_eq!(config.native.trim_start_samples, 0);
        assert_eq!(config.native.sample_rate, 48_000);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: TtsConfig = toml::from_str("").unwrap();
        assert!(config.provider.is_empty());
        assert!(config.use_cache);
        assert_eq!(config.cache_directory_name, "TextToSpeech");
    }
}
