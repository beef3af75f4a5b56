//! Configuration loading for the CLI
//!
//! Sources, later ones winning:
//! 1. defaults of [`TtsConfig`]
//! 2. an optional TOML file
//! 3. `TTS_`-prefixed environment variables, with `__` between nested keys
//!    (`TTS_PROVIDER`, `TTS_AUTH_TOKEN`, `TTS_NATIVE__SAMPLE_RATE`)

use std::path::Path;

use tts_cache::TtsConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TTS";

/// Load the configuration from `file` (if given) and the environment
pub fn load(file: Option<&Path>) -> Result<TtsConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(file) = file {
        builder = builder.add_source(config::File::from(file).required(true));
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
